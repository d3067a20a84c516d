// src/answers/matching.rs
//! Mapping free-text model replies onto form values

use regex::Regex;
use std::sync::OnceLock;

/// Edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(a_char != *b_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Option closest to `text`, case-insensitive; the first option wins ties.
pub fn best_match<'a>(text: &str, options: &'a [String]) -> Option<&'a String> {
    let text = text.to_lowercase();
    options
        .iter()
        .map(|option| (option, levenshtein(&text, &option.to_lowercase())))
        .min_by_key(|(_, distance)| *distance)
        .map(|(option, _)| option)
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid number pattern"))
}

/// First run of digits in the reply
pub fn extract_number(text: &str) -> Option<i64> {
    number_pattern()
        .find(text)
        .and_then(|found| found.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_best_match_is_case_insensitive() {
        let choices = options(&["Yes", "No", "Prefer not to say"]);
        assert_eq!(best_match("YES.", &choices).unwrap(), "Yes");
        assert_eq!(best_match("prefer not to say", &choices).unwrap(), "Prefer not to say");
    }

    #[test]
    fn test_best_match_ties_keep_first_option() {
        let choices = options(&["ab", "ba"]);
        assert_eq!(best_match("xx", &choices).unwrap(), "ab");
        assert!(best_match("anything", &[]).is_none());
    }

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("I have 7 years, maybe 8"), Some(7));
        assert_eq!(extract_number("none"), None);
    }
}
