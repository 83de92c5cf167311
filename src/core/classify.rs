//! Keyword-based categorisation and tagging of document text

/// Categories checked in order; the first category with a matching keyword wins
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Grants", &["grant"]),
    ("Marketing", &["marketing", "social media"]),
    ("Operations", &["budget", "logistics"]),
    ("HR", &["human resource", "recruitment"]),
];

const UNCATEGORIZED: &str = "Uncategorized";

const MAX_TAGS: usize = 5;
const MIN_TAG_LEN: usize = 6;
const TAG_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '(', ')', '[', ']', '{', '}', '<', '>', ':', ';', '"', '\'',
];

pub fn categorize(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(UNCATEGORIZED)
}

/// Words longer than five characters that appear exactly once
///
/// Uniqueness is judged on the raw lower-cased word, before punctuation is
/// stripped. At most five tags are returned, first occurrence first.
pub fn extract_tags(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let mut tags: Vec<String> = Vec::new();
    let candidates = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() >= MIN_TAG_LEN)
        .filter(|w| words.iter().filter(|other| **other == *w).count() == 1)
        .map(|w| w.trim_matches(TAG_PUNCTUATION).to_string())
        .take(MAX_TAGS);

    for tag in candidates {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
