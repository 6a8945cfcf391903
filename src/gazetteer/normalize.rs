//! Resort name normalization and candidate splitting.
//!
//! Normalized names are lowercase ASCII with ski jargon removed, so that
//! "Aspen Mountain Ski Resort" and "Aspen Mountain" compare equal.

/// Words stripped from resort names before comparison.
const SKI_JARGON: &[&str] = &[
    // English
    "ski", "skiing", "resort", "resorts", "mountain", "mountains", "area", "areas",
    "center", "centre", "hill", "village",
    // French
    "station", "domaine", "skiable", "val",
    // German
    "skigebiet", "skiarena", "bergbahn", "bergbahnen", "skizentrum",
    // Italian
    "stazione", "sciistica", "comprensorio", "valle",
    // Spanish
    "estacion", "esqui",
];

/// Separators between candidates on a single input line.
const CANDIDATE_SEPARATORS: &[char] = &[',', '|', ';', '\t'];

const MIN_CANDIDATE_LEN: usize = 3;
const MAX_CANDIDATE_LEN: usize = 100;
const MAX_CODE_LEN: usize = 4;

/// Normalize a resort name for comparison.
pub fn normalize(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        match fold_char(c) {
            Some(ascii) => folded.push_str(ascii),
            None if c.is_alphanumeric() => folded.push(c),
            None => folded.push(' '),
        }
    }

    folded
        .split_whitespace()
        .filter(|word| !SKI_JARGON.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a raw input line into plausible resort-name candidates.
///
/// Drops blanks, very short or very long pieces, numbers, and short
/// letter/digit codes so that dates, counts and IDs never reach the matcher.
pub fn split_candidates(line: &str) -> Vec<String> {
    line.split(CANDIDATE_SEPARATORS)
        .map(str::trim)
        .filter(|candidate| is_plausible_candidate(candidate))
        .map(str::to_string)
        .collect()
}

fn is_plausible_candidate(candidate: &str) -> bool {
    let len = candidate.chars().count();
    if !(MIN_CANDIDATE_LEN..=MAX_CANDIDATE_LEN).contains(&len) {
        return false;
    }

    if is_numeric(candidate) {
        return false;
    }

    let has_letter = candidate.chars().any(char::is_alphabetic);
    let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
    !(len <= MAX_CODE_LEN && has_letter && has_digit)
}

/// Digits with optional number punctuation, e.g. "42", "3.5", "2024-01".
fn is_numeric(candidate: &str) -> bool {
    candidate.chars().any(|c| c.is_ascii_digit())
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ':' | ' ' | '+'))
}

/// ASCII replacement for accented and ligature characters.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'ł' | 'ľ' | 'ĺ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ř' => "r",
        'ß' => "ss",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case() {
        assert_eq!(normalize("WHISTLER BLACKCOMB"), "whistler blackcomb");
    }

    #[test]
    fn test_normalize_strips_jargon() {
        assert_eq!(normalize("Ski Resort"), "");
        assert_eq!(normalize("Aspen Mountain Ski Resort"), "aspen");
        assert_eq!(normalize("Aspen Mountain"), "aspen");
    }

    #[test]
    fn test_normalize_folds_accents() {
        assert_eq!(normalize("Val d'Isère"), "d isere");
        assert_eq!(normalize("Sölden"), "solden");
        assert_eq!(normalize("Saas-Fée"), "saas fee");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ,;  "), "");
    }

    #[test]
    fn test_normalize_keeps_jargon_inside_words() {
        assert_eq!(normalize("Skiwelt Wilder Kaiser"), "skiwelt wilder kaiser");
    }

    #[test]
    fn test_split_candidates() {
        let candidates = split_candidates("Aspen Mountain, 3 runs | AB12;\t Zermatt ;42");
        assert_eq!(candidates, vec!["Aspen Mountain", "3 runs", "Zermatt"]);
    }

    #[test]
    fn test_split_candidates_drops_noise() {
        assert!(split_candidates("").is_empty());
        assert!(split_candidates("ab, 2024-01-15, X1, 12.5").is_empty());

        let long = "a".repeat(101);
        assert!(split_candidates(&long).is_empty());
    }
}
