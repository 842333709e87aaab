// 📄 Certificate Records - the extraction collaborator's output
//
// One record per certificate found in a paperwork package. Records are
// immutable once loaded; every optional field is either a non-empty string
// or absent. Loading is lenient: numbers become strings, blanks become None.

use anyhow::{bail, Context as AnyhowContext, Result};
use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

// ============================================================================
// CERTIFICATE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CertificateType {
    /// Part or Material Certification Form (ATA Specification 106)
    #[serde(rename = "ATA_106", alias = "ATA106", alias = "ATA 106")]
    Ata106,

    /// FAA Form 8130-3 (Authorized Release Certificate)
    #[serde(
        rename = "FAA_8130-3",
        alias = "FAA8130_3",
        alias = "FAA 8130-3",
        alias = "FAA_8130_3",
        alias = "8130-3"
    )]
    Faa8130_3,

    /// Certificate of Conformance / Conformity
    #[serde(rename = "COC", alias = "CoC", alias = "C of C")]
    Coc,

    /// Material certification (mill / chemical-physical report)
    #[serde(rename = "MATERIAL_CERT", alias = "MaterialCert")]
    MaterialCert,

    /// OEM manufacturer certification
    #[serde(rename = "OEM_CERT", alias = "OEMCert", alias = "OemCert")]
    OemCert,

    /// European Certificate of Conformity (EN 10204)
    #[serde(rename = "EUROPEAN_COC", alias = "EuropeanCOC", alias = "EuropeanCoc")]
    EuropeanCoc,

    /// Anything else the extractor labelled (packing slips, bills of sale, ...)
    #[serde(other)]
    Other,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Ata106 => "ATA 106",
            CertificateType::Faa8130_3 => "FAA Form 8130-3",
            CertificateType::Coc => "Certificate of Conformity",
            CertificateType::MaterialCert => "Material Certification",
            CertificateType::OemCert => "OEM Certification",
            CertificateType::EuropeanCoc => "European Certificate of Conformity",
            CertificateType::Other => "Other",
        }
    }
}

// ============================================================================
// CERTIFICATE RECORD
// ============================================================================

/// One extracted certificate.
///
/// Field names follow the extractor's snake_case JSON; camelCase spellings are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    #[serde(alias = "certificateType")]
    pub certificate_type: CertificateType,

    #[serde(alias = "partNumber", default, deserialize_with = "lenient_required")]
    pub part_number: String,

    #[serde(alias = "serialNumber", default, deserialize_with = "lenient_optional")]
    pub serial_number: Option<String>,

    #[serde(default, deserialize_with = "lenient_optional")]
    pub description: Option<String>,

    #[serde(alias = "conditionCode", default, deserialize_with = "lenient_optional")]
    pub condition_code: Option<String>,

    #[serde(default, deserialize_with = "lenient_optional")]
    pub quantity: Option<String>,

    #[serde(default, deserialize_with = "lenient_optional")]
    pub manufacturer: Option<String>,

    #[serde(alias = "sellerName", default, deserialize_with = "lenient_optional")]
    pub seller_name: Option<String>,

    #[serde(alias = "buyerName", default, deserialize_with = "lenient_optional")]
    pub buyer_name: Option<String>,

    #[serde(alias = "certificationDate", default, deserialize_with = "lenient_optional")]
    pub certification_date: Option<String>,

    /// Sworn free-text statement of prior origin
    #[serde(alias = "traceabilitySource", default, deserialize_with = "lenient_optional")]
    pub traceability_source: Option<String>,

    #[serde(alias = "documentId", default, deserialize_with = "lenient_required")]
    pub document_id: String,
}

impl CertificateRecord {
    /// Minimal record; the remaining fields are filled with the `with_*` helpers.
    pub fn new(certificate_type: CertificateType, part_number: &str, document_id: &str) -> Self {
        CertificateRecord {
            certificate_type,
            part_number: part_number.trim().to_string(),
            serial_number: None,
            description: None,
            condition_code: None,
            quantity: None,
            manufacturer: None,
            seller_name: None,
            buyer_name: None,
            certification_date: None,
            traceability_source: None,
            document_id: document_id.trim().to_string(),
        }
    }

    pub fn with_seller(mut self, seller: &str) -> Self {
        self.seller_name = non_empty(seller);
        self
    }

    pub fn with_buyer(mut self, buyer: &str) -> Self {
        self.buyer_name = non_empty(buyer);
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: &str) -> Self {
        self.manufacturer = non_empty(manufacturer);
        self
    }

    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial_number = non_empty(serial);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = non_empty(description);
        self
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition_code = non_empty(condition);
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.certification_date = non_empty(date);
        self
    }

    pub fn with_traceability_source(mut self, statement: &str) -> Self {
        self.traceability_source = non_empty(statement);
        self
    }

    pub fn seller(&self) -> Option<&str> {
        self.seller_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn buyer(&self) -> Option<&str> {
        self.buyer_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn declared_source(&self) -> Option<&str> {
        self.traceability_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parsed certification date; None when absent or unparseable.
    pub fn certified_on(&self) -> Option<NaiveDate> {
        self.certification_date.as_deref().and_then(parse_certification_date)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// DATE PARSING
// ============================================================================

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

/// Parse the date formats seen on 8130-3s, C of Cs and ATA 106 forms.
pub fn parse_certification_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // "2016-12-29T00:00:00" → date part only
    let candidate = trimmed.split('T').next().unwrap_or(trimmed);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        })
}

// ============================================================================
// LENIENT FIELD DESERIALIZATION
// ============================================================================

struct LenientString;

impl<'de> Visitor<'de> for LenientString {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(non_empty(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(non_empty(&v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Self::Value, D::Error> {
        d.deserialize_any(LenientString)
    }
}

fn lenient_optional<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    d.deserialize_any(LenientString)
}

fn lenient_required<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(d.deserialize_any(LenientString)?.unwrap_or_default())
}

// ============================================================================
// LOADERS
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExtractionFile {
    extraction_results: BTreeMap<String, Vec<CertificateRecord>>,
}

/// Load the extractor's batch output, keyed by document name.
///
/// Accepts `{"extraction_results": {doc: [...]}}`, a bare `{doc: [...]}` map,
/// or a bare list (one document named after the file stem). Records without a
/// `document_id` are stamped with their document name.
pub fn load_extraction_results(path: &Path) -> Result<BTreeMap<String, Vec<CertificateRecord>>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read extraction results: {:?}", path))?;

    let value: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse extraction results JSON")?;

    let mut documents: BTreeMap<String, Vec<CertificateRecord>> = match value {
        serde_json::Value::Object(ref map) if map.contains_key("extraction_results") => {
            let file: ExtractionFile = serde_json::from_value(value)
                .context("Malformed `extraction_results` section")?;
            file.extraction_results
        }
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .context("Expected a map of document name to certificate list")?,
        serde_json::Value::Array(_) => {
            let records: Vec<CertificateRecord> =
                serde_json::from_value(value).context("Malformed certificate list")?;
            let name = document_name_from_path(path);
            let mut single = BTreeMap::new();
            single.insert(name, records);
            single
        }
        _ => bail!("Extraction results must be a JSON object or array: {:?}", path),
    };

    for (document, records) in documents.iter_mut() {
        stamp_document_id(records, document);
    }

    Ok(documents)
}

/// Flat CSV row. Kept separate from `CertificateRecord` so that csv's type
/// inference never turns a part number like "00123" into an integer.
#[derive(Debug, Deserialize)]
struct CsvCertificateRow {
    certificate_type: CertificateType,
    part_number: Option<String>,
    serial_number: Option<String>,
    description: Option<String>,
    condition_code: Option<String>,
    quantity: Option<String>,
    manufacturer: Option<String>,
    seller_name: Option<String>,
    buyer_name: Option<String>,
    certification_date: Option<String>,
    traceability_source: Option<String>,
    document_id: Option<String>,
}

impl From<CsvCertificateRow> for CertificateRecord {
    fn from(row: CsvCertificateRow) -> Self {
        let clean = |field: Option<String>| field.as_deref().and_then(non_empty);
        CertificateRecord {
            certificate_type: row.certificate_type,
            part_number: clean(row.part_number).unwrap_or_default(),
            serial_number: clean(row.serial_number),
            description: clean(row.description),
            condition_code: clean(row.condition_code),
            quantity: clean(row.quantity),
            manufacturer: clean(row.manufacturer),
            seller_name: clean(row.seller_name),
            buyer_name: clean(row.buyer_name),
            certification_date: clean(row.certification_date),
            traceability_source: clean(row.traceability_source),
            document_id: clean(row.document_id).unwrap_or_default(),
        }
    }
}

/// Load certificates from a flat CSV export (header row uses the JSON field names).
///
/// Rows are grouped by `document_id`; rows without one fall under the file stem.
pub fn load_certificates_csv(path: &Path) -> Result<BTreeMap<String, Vec<CertificateRecord>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open certificate CSV: {:?}", path))?;

    let fallback = document_name_from_path(path);
    let mut documents: BTreeMap<String, Vec<CertificateRecord>> = BTreeMap::new();

    for (line, result) in reader.deserialize::<CsvCertificateRow>().enumerate() {
        let row = result.with_context(|| format!("Malformed certificate on CSV row {}", line + 2))?;
        let mut record = CertificateRecord::from(row);
        if record.document_id.is_empty() {
            record.document_id = fallback.clone();
        }
        documents
            .entry(record.document_id.clone())
            .or_default()
            .push(record);
    }

    Ok(documents)
}

/// Pick the loader by extension (`.csv` or JSON).
pub fn load_documents(path: &Path) -> Result<BTreeMap<String, Vec<CertificateRecord>>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        load_certificates_csv(path)
    } else {
        load_extraction_results(path)
    }
}

fn stamp_document_id(records: &mut [CertificateRecord], document: &str) {
    for record in records.iter_mut() {
        if record.document_id.is_empty() {
            record.document_id = document.to_string();
        }
    }
}

fn document_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

// ============================================================================
// TESTS
// ============================================================================
