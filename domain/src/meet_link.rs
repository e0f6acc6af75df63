//! Meet link and meeting-code handling.
//!
//! The audit log reports meeting codes as bare uppercase letters
//! ("ABCDEFGHIJ") while calendar events and stored links carry the dashed
//! form ("abc-defg-hij"). Everything that compares codes goes through
//! [`normalize_meet_code`] so the two spellings collide.

const MEET_LINK_PREFIX: &str = "https://meet.google.com/";
const MEET_HOST: &str = "meet.google.com/";

/// Shorter paths are shortcuts like "/new", not meeting codes.
const MIN_CODE_LEN: usize = 5;

/// Lowercases and strips everything that is not a letter or digit, so dashed
/// and bare spellings of the same code compare equal.
pub fn normalize_meet_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Extracts the normalized meeting code from a Meet URL, if the URL carries
/// one.
pub fn meet_code_from_link(link: &str) -> Option<String> {
    let host_idx = link.find(MEET_HOST)?;
    let mut path = &link[host_idx + MEET_HOST.len()..];
    if let Some(rest) = path.strip_prefix("lookup/") {
        path = rest;
    }
    let end = path
        .find(|c: char| c.is_whitespace() || matches!(c, '?' | '#' | '/'))
        .unwrap_or(path.len());

    let code = normalize_meet_code(&path[..end]);
    (code.len() >= MIN_CODE_LEN).then_some(code)
}

/// Scans free-form text (an event description, say) for the first Meet URL
/// that carries a meeting code.
pub fn find_meet_link(text: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(MEET_LINK_PREFIX) {
        let start = search_from + offset;
        let tail = &text[start..];
        let end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | ')'))
            .unwrap_or(tail.len());
        let candidate = tail[..end].trim_end_matches(['.', ',', ';']);

        if meet_code_from_link(candidate).is_some() {
            return Some(candidate.to_string());
        }
        search_from = start + MEET_LINK_PREFIX.len();
    }
    None
}
