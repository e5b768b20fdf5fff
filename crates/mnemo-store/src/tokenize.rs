use std::collections::HashSet;

/// Normalize free text into comparable terms.
///
/// Splits on any non-alphanumeric boundary, lowercases every term, and
/// drops duplicates while preserving first-occurrence order. Empty or
/// whitespace-only input yields no terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut buf = String::new();

    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            buf.push(ch);
        } else if !buf.is_empty() {
            if seen.insert(buf.clone()) {
                out.push(buf.clone());
            }
            buf.clear();
        }
    }
    if !buf.is_empty() && seen.insert(buf.clone()) {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_punctuation_and_lowercases() {
        assert_eq!(
            tokenize("Hello, World! hello?"),
            vec!["hello".to_string(), "world".to_string()]
        );
    }

    #[test]
    fn test_preserves_first_occurrence_order() {
        assert_eq!(tokenize("b a b c a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n").is_empty());
        assert!(tokenize("!!! --- ...").is_empty());
    }

    #[test]
    fn test_digits_are_terms() {
        assert_eq!(tokenize("Project codename is 42"), vec!["project", "codename", "is", "42"]);
    }
}
