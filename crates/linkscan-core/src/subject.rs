//! Subject intake: finding URLs in chat text and deriving investigation ids

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Scheme-prefixed tokens, or bare dotted hostnames with an optional path
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z][a-zA-Z0-9+.-]*:(//)?[^\s]*|\b(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}\b(?:/[^\s]*)?")
        .expect("URL pattern is valid")
});

/// Every URL-like token in `text`, in order of appearance
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Stable investigation id: lowercase hex SHA-256 of the subject
pub fn investigation_id(subject: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opening message of an investigation
///
/// Subjects longer than `long_url_threshold` characters are withheld from the
/// backend; the prompt asks for an ERROR verdict with a warning instead.
pub fn initial_prompt(subject: &str, id: &str, long_url_threshold: usize) -> String {
    let length = subject.chars().count();
    if length > long_url_threshold {
        format!(
            "Start the investigation for the URL with ID: {id}. \
             The URL is EXTREMELY LONG ({length} characters), which indicates a possible \
             denial-of-service attempt or an attempt to obscure the real destination. \
             The URL itself has been withheld because it could crash or disrupt the system. \
             Do not call any tools. Respond with status ERROR, category SUSPICIOUS, and use \
             the explanation to give the sender a firm warning that inputs like this can \
             disrupt the system."
        )
    } else {
        format!("Start the investigation for the URL: {subject} with ID: {id}")
    }
}
