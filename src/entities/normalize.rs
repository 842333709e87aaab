// 🔤 Entity Name Normalization
//
// "APPLIED AVIONICS, INC.", "Applied Avionics Inc" and "applied avionics"
// must all land on the same key. Certificates are typed by hand, OCR'd and
// re-typed by a model, so the key has to survive punctuation, casing,
// corporate suffixes and the odd typo.

/// Trailing tokens that carry no identity ("S.A. de C.V." → sa de cv)
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc", "incorporated", "corp", "corporation", "llc", "ltd", "limited", "co", "company",
    "sa", "de", "cv", "sadecv", "gmbh", "ag", "plc", "lp", "llp", "srl", "bv", "nv", "sas",
    "pte", "pty",
];

/// Abbreviations expanded so both spellings share a key
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("intl", "international"),
    ("mfg", "manufacturing"),
    ("svcs", "services"),
    ("svc", "service"),
    ("aviat", "aviation"),
];

/// Normalize an entity name into its matching key.
///
/// - Lowercase
/// - `&` → "and"; apostrophes and periods dropped ("Int'l" → intl, "S.A." → sa)
/// - Other punctuation → whitespace, whitespace collapsed
/// - Known abbreviations expanded
/// - Trailing corporate suffixes removed (at least one token is kept)
///
/// Example: "Aventure Int'l Aviation Services, LLC" → "aventure international aviation services"
pub fn normalize_entity_name(name: &str) -> String {
    name_tokens(name).join(" ")
}

/// Normalized tokens of a name (see [`normalize_entity_name`]).
pub fn name_tokens(name: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        match c {
            '&' => cleaned.push_str(" and "),
            '\'' | '’' | '`' | '.' => {}
            c if c.is_alphanumeric() => cleaned.push(c),
            _ => cleaned.push(' '),
        }
    }

    let mut tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == token)
                .map(|(_, long)| long.to_string())
                .unwrap_or_else(|| token.to_string())
        })
        .collect();

    while tokens.len() > 1 {
        let last = tokens.last().map(String::as_str).unwrap_or_default();
        if CORPORATE_SUFFIXES.contains(&last) {
            tokens.pop();
        } else {
            break;
        }
    }

    if tokens.len() > 1 && tokens[0] == "the" {
        tokens.remove(0);
    }

    tokens
}

/// True for tokens like "inc", "llc", "sa" that carry no identity
pub fn is_corporate_suffix(token: &str) -> bool {
    CORPORATE_SUFFIXES.contains(&token)
}

/// Position of `needle` as a contiguous run inside `haystack`, if any.
pub fn find_token_run(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Check if two strings match within Levenshtein distance threshold
pub fn levenshtein_match(s1: &str, s2: &str, threshold: usize) -> bool {
    levenshtein_distance(s1, s2) <= threshold
}

/// Calculate Levenshtein distance between two strings
///
/// Minimum number of single-character edits (insertions, deletions,
/// substitutions) to change one string into the other. Operates on chars,
/// so accented names ("Aeroespacial", "Logística") are measured correctly.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows instead of the full matrix
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1) // deletion
                .min(current[j] + 1) // insertion
                .min(previous[j] + cost); // substitution
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

// ============================================================================
// TESTS
// ============================================================================
