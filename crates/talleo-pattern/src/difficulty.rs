//! Difficulty estimation for address patterns

use crate::PatternType;

/// Expected number of candidate keys before a match.
///
/// Characters covered by the network tag are free; every further character
/// is assumed to be uniform over the alphabet.
pub fn calculate_difficulty(
    pattern: &str,
    pattern_type: PatternType,
    tag_len: usize,
    alphabet_size: usize,
) -> f64 {
    let free_chars = pattern.chars().count().saturating_sub(tag_len);

    match pattern_type {
        PatternType::Prefix => (alphabet_size as f64).powi(free_chars as i32),
        // One spend+view pair out of the whole 512-bit space
        PatternType::Exact => 2f64.powi(512),
    }
}

/// Format difficulty as human-readable string
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2e}", difficulty)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.0}", difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_calculation() {
        // Tag alone is free
        assert_eq!(calculate_difficulty("TA", PatternType::Prefix, 2, 58), 1.0);
        // Two characters past the tag
        assert_eq!(calculate_difficulty("TAbc", PatternType::Prefix, 2, 58), 3364.0);
    }

    #[test]
    fn test_exact_is_whole_keyspace() {
        let exact = calculate_difficulty("TA", PatternType::Exact, 2, 58);
        assert_eq!(exact, 2f64.powi(512));
    }

    #[test]
    fn test_format_difficulty() {
        assert_eq!(format_difficulty(1.0), "1");
        assert_eq!(format_difficulty(1000.0), "1.00K");
        assert_eq!(format_difficulty(1500000.0), "1.50M");
        assert_eq!(format_difficulty(1e12), "1.00T");
    }
}
