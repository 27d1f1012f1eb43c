use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).expect("invalid url regex")
});

/// URLs mentioned in `text`, first occurrence order, without duplicates.
///
/// Trailing sentence punctuation is not part of the link.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_PATTERN
        .find_iter(text)
        .map(|found| found.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .filter(|url| seen.insert(url.to_string()))
        .map(str::to_string)
        .collect()
}
