// Parts Trace - CLI
// Validate certificate batches, look up entities, manage registry snapshots.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parts_trace::{
    init_tracing, load_documents, BatchReport, EntityClassifier, EntityRegistry, RegistryStore,
    StoreClassifier, TraceConfig, Validator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trace aviation parts back to their source and classify compliance.
#[derive(Parser)]
#[command(name = "parts-trace", about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where entity categories come from
#[derive(clap::Args)]
struct RegistryArgs {
    /// Registry JSON file (list of entries); built-in table when omitted
    #[arg(long, conflicts_with = "store")]
    registry: Option<PathBuf>,

    /// SQLite registry store
    #[arg(long)]
    store: Option<PathBuf>,

    /// Snapshot version in the store; latest when omitted
    #[arg(long = "version", requires = "store")]
    snapshot_version: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate every document in an extraction JSON or certificate CSV
    Validate {
        /// Extraction results (.json) or flat certificate export (.csv)
        #[arg(long)]
        input: PathBuf,

        /// Target buyer used to anchor each chain (overrides config)
        #[arg(long)]
        buyer: Option<String>,

        #[command(flatten)]
        source: RegistryArgs,

        /// TraceConfig JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the batch report here as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Classify one entity name
    Lookup {
        name: String,

        #[command(flatten)]
        source: RegistryArgs,

        /// TraceConfig JSON file (fuzzy match distance)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Registry snapshot management
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

#[derive(Subcommand)]
enum RegistryCommand {
    /// Write a registry snapshot (built-in, or from a store) to JSON
    Export {
        path: PathBuf,

        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long = "version", requires = "store")]
        snapshot_version: Option<u64>,
    },

    /// Append a registry JSON file to a store as a new snapshot
    Import {
        path: PathBuf,

        #[arg(long)]
        store: PathBuf,
    },

    /// List the snapshots held in a store
    Versions {
        #[arg(long)]
        store: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate {
            input,
            buyer,
            source,
            config,
            output,
        } => run_validate(&input, buyer, &source, config.as_deref(), output.as_deref()),
        Command::Lookup { name, source, config } => run_lookup(&name, &source, config.as_deref()),
        Command::Registry { command } => match command {
            RegistryCommand::Export {
                path,
                store,
                snapshot_version,
            } => run_export(&path, store.as_deref(), snapshot_version),
            RegistryCommand::Import { path, store } => run_import(&path, &store),
            RegistryCommand::Versions { store } => run_versions(&store),
        },
    }
}

// ============================================================================
// Classifier selection
// ============================================================================

fn build_classifier(source: &RegistryArgs, fuzzy_distance: usize) -> Result<Arc<dyn EntityClassifier>> {
    if let Some(store) = &source.store {
        let classifier = StoreClassifier::open(store, source.snapshot_version)?
            .with_fuzzy_distance(fuzzy_distance);
        return Ok(Arc::new(classifier));
    }

    let registry = match &source.registry {
        Some(path) => EntityRegistry::from_file(path)?,
        None => EntityRegistry::with_defaults(),
    };
    Ok(Arc::new(registry.with_fuzzy_distance(fuzzy_distance)))
}

fn load_config(path: Option<&Path>) -> Result<TraceConfig> {
    match path {
        Some(path) => TraceConfig::from_file(path),
        None => Ok(TraceConfig::default()),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_validate(
    input: &Path,
    buyer: Option<String>,
    source: &RegistryArgs,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    println!("🛫 Parts Trace - Source Compliance");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut config = load_config(config_path)?;
    if let Some(buyer) = buyer {
        config.target_buyer = buyer;
    }

    // 1. Load certificates
    println!("\n📂 Loading certificates...");
    let documents = load_documents(input)?;
    let cert_count: usize = documents.values().map(Vec::len).sum();
    println!("✓ Loaded {} certificates across {} documents", cert_count, documents.len());

    // 2. Evaluate
    println!("\n🔍 Building chains (target buyer: {})...", config.target_buyer);
    let classifier = build_classifier(source, config.fuzzy_distance)?;
    let validator = Validator::new(classifier, config)?;
    let report = validator.validate_batch(&documents)?;

    for (document_id, document) in &report.documents {
        let Some((part, result)) = document.part_of_interest() else {
            continue;
        };
        let mark = if document.is_compliant() { "✅" } else { "❌" };
        println!(
            "{} {} [{}] {} ({})",
            mark,
            document_id,
            part,
            result.verdict.final_source_type,
            result.verdict.final_source_name
        );
        if let Some(chain) = &result.chain {
            println!("     {}", chain.render());
        }
        for violation in &result.verdict.violations {
            println!("     ⚠️  {}", violation);
        }
    }

    // 3. Summary
    print_summary(&report);

    if let Some(path) = output {
        report.save(path)?;
        println!("\n💾 Report written to {:?}", path);
    }

    Ok(())
}

fn print_summary(report: &BatchReport) {
    let summary = &report.summary;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Summary (run {})", report.run_id);
    if let Some(snapshot) = &report.registry_snapshot {
        println!("   Registry snapshot: {}", snapshot);
    }
    println!(
        "   Compliant documents: {}/{} ({:.1}%)",
        summary.compliant_documents,
        summary.total_documents,
        summary.compliance_rate * 100.0
    );
    println!("   Compliant parts:     {}/{}", summary.compliant_parts, summary.total_parts);
    println!("   Complete chains:     {}", summary.complete_chains);
    println!("   Declared links:      {}", summary.declared_links);

    for (source_type, count) in &summary.source_types {
        println!("   {:<12} {}", source_type, count);
    }
    for entity in &summary.fraudulent_entities {
        println!("   🚨 Fraudulent source found: {}", entity);
    }
}

fn run_lookup(name: &str, source: &RegistryArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let classifier = build_classifier(source, config.fuzzy_distance)?;
    let entry = classifier.classify(name)?;

    println!("🔎 {}", name);
    if entry.is_registered() {
        println!("   Canonical: {}", entry.canonical_name);
    }
    println!("   Category:  {} ({})", entry.category, entry.category.description());
    println!("   Evidence:  {}", entry.evidence);
    if let Some(snapshot) = classifier.snapshot_id() {
        println!("   Snapshot:  {}", snapshot);
    }
    Ok(())
}

fn run_export(path: &Path, store: Option<&Path>, version: Option<u64>) -> Result<()> {
    let registry = match store {
        Some(store_path) => {
            let store = RegistryStore::open(store_path)?;
            match version {
                Some(version) => store.load_snapshot(version)?,
                None => match store.load_latest()? {
                    Some(registry) => registry,
                    None => bail!("Registry store {:?} holds no snapshot", store_path),
                },
            }
        }
        None => EntityRegistry::with_defaults(),
    };

    registry.save_to_file(path)?;
    println!(
        "✓ Exported registry v{} ({} entries, fingerprint {}) to {:?}",
        registry.version(),
        registry.len(),
        registry.fingerprint(),
        path
    );
    Ok(())
}

fn run_import(path: &Path, store_path: &Path) -> Result<()> {
    let registry = EntityRegistry::from_file(path)?;
    let mut store = RegistryStore::open(store_path)?;
    let version = store
        .append(&registry)
        .with_context(|| format!("Failed to import {:?} into {:?}", path, store_path))?;

    println!("✓ Registry stored as version {} ({} entries)", version, registry.len());
    Ok(())
}

fn run_versions(store_path: &Path) -> Result<()> {
    let store = RegistryStore::open(store_path)?;
    let versions = store.versions()?;

    if versions.is_empty() {
        println!("No snapshots stored in {:?}", store_path);
        return Ok(());
    }
    for stored in versions {
        println!(
            "v{:<4} {:>4} entries  {}  {}",
            stored.version,
            stored.entry_count,
            stored.created_at.format("%Y-%m-%d %H:%M:%S"),
            stored.fingerprint
        );
    }
    Ok(())
}
