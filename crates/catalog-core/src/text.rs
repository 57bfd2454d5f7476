//! Text analysis shared by both backends so a text query matches the same
//! products in each: split on non-alphanumeric characters, lower-case, drop
//! stop words.

pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it", "its", "of", "on",
    "that", "the", "to", "was", "will", "with", "or", "but", "not", "this", "these", "they", "them", "their", "there",
    "then", "than", "so", "if", "when", "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could",
    "should", "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
];

/// Query strings meaning "every product".
pub fn is_match_all(query: &str) -> bool {
    let q = query.trim();
    q.is_empty() || q == "*"
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_stop_words() {
        assert_eq!(tokenize("The Green-Bag of  Something!"), vec!["green", "bag", "something"]);
        assert_eq!(tokenize("id2"), vec!["id2"]);
        assert!(tokenize("  ").is_empty());
    }

    #[test]
    fn star_and_blank_match_all() {
        assert!(is_match_all(" * "));
        assert!(is_match_all(""));
        assert!(!is_match_all("kitty"));
    }
}
