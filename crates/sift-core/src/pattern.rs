//! Wildcard description patterns
//!
//! Patterns use SQL LIKE syntax: `%` matches any run of characters (including
//! none) and `_` matches exactly one character. Everything else is literal.
//! Matching is case-insensitive and anchored to the whole description, so the
//! same pattern the transaction service evaluates server-side can be evaluated
//! against an already-fetched candidate set without another round trip.

use regex::{Regex, RegexBuilder};

use crate::error::Result;

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    /// `None` for the empty pattern, which matches nothing
    regex: Option<Regex>,
}

impl WildcardPattern {
    /// Compile a wildcard pattern into an anchored, case-insensitive matcher
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self {
                source: String::new(),
                regex: None,
            });
        }

        let regex = RegexBuilder::new(&to_regex_source(pattern))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;

        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    /// Check whether a description matches this pattern
    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// The original wildcard text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

/// Translate LIKE syntax to a regex source string
fn to_regex_source(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '%' | '_' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '%' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

/// One-shot match of a pattern against a description
///
/// Invalid patterns never match.
pub fn matches(pattern: &str, text: &str) -> bool {
    WildcardPattern::compile(pattern)
        .map(|p| p.matches(text))
        .unwrap_or(false)
}

/// Derive a wildcard pattern from a description when the service did not supply one
///
/// Keeps the leading run of purely alphabetic words (stopping at the first word
/// that carries a digit or a reference marker like `#` or `*`) and appends `%`.
pub fn suggest_pattern(description: &str) -> Option<String> {
    let words: Vec<String> = description
        .split_whitespace()
        .take_while(|word| {
            !word
                .chars()
                .any(|c| c.is_ascii_digit() || c == '#' || c == '*')
        })
        .filter(|word| word.chars().any(|c| c.is_alphabetic()))
        .map(|word| word.to_uppercase())
        .collect();

    if words.is_empty() {
        return None;
    }

    Some(format!("{}%", words.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_matches_any_run() {
        let p = WildcardPattern::compile("AMZN%").unwrap();
        assert!(p.matches("AMZN MKTP US"));
        assert!(p.matches("AMZN"));
        assert!(!p.matches("PAYPAL AMZN"));
    }

    #[test]
    fn test_underscore_matches_single_char() {
        let p = WildcardPattern::compile("SQ _OFFEE").unwrap();
        assert!(p.matches("SQ COFFEE"));
        assert!(!p.matches("SQ OFFEE"));
        assert!(!p.matches("SQ XXOFFEE"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("netflix%", "NETFLIX.COM"));
        assert!(matches("NETFLIX%", "netflix.com"));
    }

    #[test]
    fn test_without_wildcards_is_literal_whole_match() {
        assert!(matches("Spotify USA", "SPOTIFY usa"));
        assert!(!matches("Spotify", "SPOTIFY USA"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("A.B%", "A.B STORE"));
        assert!(!matches("A.B%", "AXB STORE"));
        assert!(matches("COST (US)%", "COST (US) 123"));
        assert!(matches("PAY$PAL*%", "PAY$PAL*REF"));
        assert!(!matches("[A-Z]%", "B"));
        assert!(matches("1+1?%", "1+1?"));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        let p = WildcardPattern::compile("").unwrap();
        assert!(p.is_empty());
        assert!(!p.matches(""));
        assert!(!p.matches("ANYTHING"));
    }

    #[test]
    fn test_lone_percent_matches_everything() {
        assert!(matches("%", ""));
        assert!(matches("%", "WHATEVER"));
    }

    #[test]
    fn test_suggest_pattern() {
        assert_eq!(
            suggest_pattern("Amzn Mktp US*2K4 Seattle"),
            Some("AMZN MKTP%".to_string())
        );
        assert_eq!(
            suggest_pattern("STARBUCKS STORE 1234"),
            Some("STARBUCKS STORE%".to_string())
        );
        assert_eq!(suggest_pattern("#4411 PAYMENT"), None);
        assert_eq!(suggest_pattern("   "), None);
    }

    #[test]
    fn test_suggested_pattern_matches_its_source() {
        let description = "TRADER JOE'S #552";
        let pattern = suggest_pattern(description).unwrap();
        assert!(matches(&pattern, description));
    }
}
