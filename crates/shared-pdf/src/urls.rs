//! URL scanning over extracted text.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Scheme or `www.` prefix followed by anything that is not whitespace or an
/// obvious breaker character.
static URL_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Punctuation commonly stuck to the end of a URL in running text.
const TRIM_TRAILING: &[char] = &['.', ',', ')', ';', ':', '!', '?', '\'', '"', '”', '’'];

fn url_pattern() -> &'static Regex {
    URL_PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b((?:https?://|www\.)[^\s<>()\[\]{}"']+)"#)
            .expect("url pattern is valid")
    })
}

/// Unique URLs found in `text`, sorted case-insensitively.
pub fn find_urls(text: &str) -> Vec<String> {
    let mut found: BTreeSet<String> = BTreeSet::new();

    for capture in url_pattern().find_iter(text) {
        let url = capture.as_str().trim_end_matches(TRIM_TRAILING);
        if !url.is_empty() {
            found.insert(url.to_string());
        }
    }

    let mut urls: Vec<String> = found.into_iter().collect();
    urls.sort_by_key(|u| u.to_lowercase());
    urls
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: scanning never panics and never yields duplicates.
        #[test]
        fn scan_is_total_and_unique(text in ".{0,400}") {
            let urls = find_urls(&text);
            let mut deduped = urls.clone();
            deduped.dedup();
            prop_assert_eq!(urls, deduped);
        }

        /// Property: the output order is case-insensitively sorted.
        #[test]
        fn scan_output_is_sorted(hosts in prop::collection::vec("[a-zA-Z]{1,8}", 0..6)) {
            let text: String = hosts
                .iter()
                .map(|h| format!("https://{}.test ", h))
                .collect();
            let urls = find_urls(&text);
            let mut sorted = urls.clone();
            sorted.sort_by_key(|u| u.to_lowercase());
            prop_assert_eq!(urls, sorted);
        }
    }
}
