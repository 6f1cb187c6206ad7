// src/cache/text_similarity.rs
//! Coarse title/company comparison used to pre-filter similarity candidates.

/// Normalized edit similarity over chars, 1.0 for two empty strings.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Case-insensitive equality, containment either way, or edit similarity above `threshold`.
pub fn is_text_similar(a: &str, b: &str, threshold: f64) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    a == b || a.contains(&b) || b.contains(&a) || levenshtein_similarity(&a, &b) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_similarity() {
        assert_eq!(levenshtein_similarity("", ""), 1.0);
        assert_eq!(levenshtein_similarity("abcd", "abcd"), 1.0);
        assert_eq!(levenshtein_similarity("abcd", "wxyz"), 0.0);
        assert!((levenshtein_similarity("kitten", "sitting") - 4.0 / 7.0).abs() < 1e-9);
        assert_eq!(levenshtein_similarity("café", "cafe"), 0.75);
    }

    #[test]
    fn test_is_text_similar() {
        assert!(is_text_similar("Acme Corp", "  acme corp ", 0.7));
        assert!(is_text_similar("Acme", "Acme Corporation", 0.7));
        assert!(is_text_similar("Senior Backend Engineer", "Senior Backend Enginer", 0.7));
        assert!(!is_text_similar("Acme Corp", "Globex Industries", 0.7));
        assert!(!is_text_similar("Data Scientist", "Sales Manager", 0.7));
    }
}
