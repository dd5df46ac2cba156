use std::borrow::Cow;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

pub const PRIVATE_PLACEHOLDER: &str = "[private]";

/// Masks sensitive words in window titles before they reach the database.
#[derive(Debug, Clone)]
pub struct PrivacyFilter {
    pattern: Option<Regex>,
}

impl PrivacyFilter {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let alternatives = keywords
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .context("invalid privacy keywords")?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn mask<'a>(&self, title: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(title, PRIVATE_PLACEHOLDER),
            None => Cow::Borrowed(title),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::PrivacyFilter;

    #[test]
    fn keywords_are_masked_ignoring_case() -> Result<()> {
        let filter = PrivacyFilter::new(&["password".into(), "Bank".into()])?;
        assert_eq!(
            filter.mask("Reset PASSWORD - My bank - Firefox"),
            "Reset [private] - My [private] - Firefox"
        );
        assert_eq!(filter.mask("main.rs - code"), "main.rs - code");
        Ok(())
    }

    #[test]
    fn regex_characters_are_literal() -> Result<()> {
        let filter = PrivacyFilter::new(&["a.b".into(), "  ".into()])?;
        assert_eq!(filter.mask("axb a.b"), "axb [private]");
        Ok(())
    }

    #[test]
    fn no_keywords_leaves_titles_alone() -> Result<()> {
        let filter = PrivacyFilter::new(&[])?;
        assert_eq!(filter.mask("password"), "password");
        Ok(())
    }
}
