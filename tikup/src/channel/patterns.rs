//! Text predicates used to recognise interactive questions in device output.
//!
//! Detecting a question by looking for a phrase in free-text output is a
//! heuristic. The predicates are traits so other phrasings (older RouterOS
//! releases, localized builds) can be plugged into the upgrade workflow
//! without touching it.

use regex::bytes::Regex;

/// Trait for prompt matching - regex by default, extensible for custom parsers.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

/// Regex-based prompt matcher (the default implementation).
impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// Decides whether command output is asking the operator to confirm.
pub trait ConfirmationPrompt: Send + Sync {
    /// Returns `true` when `text` ends in (or contains) a confirmation question.
    fn looks_like_confirmation(&self, text: &str) -> bool;
}

/// Matches when any of a list of phrases occurs in the output.
#[derive(Debug, Clone)]
pub struct PhrasePrompt {
    phrases: Vec<String>,
    case_insensitive: bool,
}

impl PhrasePrompt {
    /// Case-sensitive phrase matcher.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Phrase matcher that ignores ASCII case on both sides.
    pub fn case_insensitive<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
            case_insensitive: true,
        }
    }

    /// Add another accepted phrasing.
    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        self.phrases.push(if self.case_insensitive {
            phrase.to_lowercase()
        } else {
            phrase
        });
        self
    }

    /// The question RouterOS asks before installing a downloaded package.
    pub fn package_upgrade() -> Self {
        Self::new(["Do you want to upgrade"])
    }

    /// Any `[y/n]` style yes/no cue, as printed by `/system reboot`.
    pub fn yes_no() -> Self {
        Self::case_insensitive(["y/n"])
    }

    /// Install output saying there is nothing to do.
    pub fn up_to_date() -> Self {
        Self::case_insensitive(["up to date"])
    }
}

impl ConfirmationPrompt for PhrasePrompt {
    fn looks_like_confirmation(&self, text: &str) -> bool {
        if self.case_insensitive {
            let lowered = text.to_lowercase();
            self.phrases.iter().any(|p| lowered.contains(p.as_str()))
        } else {
            self.phrases.iter().any(|p| text.contains(p.as_str()))
        }
    }
}

impl<F> ConfirmationPrompt for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn looks_like_confirmation(&self, text: &str) -> bool {
        self(text)
    }
}

/// Compile a prompt pattern string into a regex anchored at the end of output.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_upgrade_prompt() {
        let prompt = PhrasePrompt::package_upgrade();
        assert!(prompt.looks_like_confirmation(
            "installing 7.15.3\r\nDo you want to upgrade? [y/N]"
        ));
        assert!(!prompt.looks_like_confirmation("do you want to upgrade"));
        assert!(!prompt.looks_like_confirmation("status: Downloaded, rebooting..."));
    }

    #[test]
    fn test_yes_no_is_case_insensitive() {
        let prompt = PhrasePrompt::yes_no();
        assert!(prompt.looks_like_confirmation("Reboot, yes? [y/N]:"));
        assert!(prompt.looks_like_confirmation("Do you really want to reboot? [Y/n]"));
        assert!(!prompt.looks_like_confirmation("rebooting"));
    }

    #[test]
    fn test_with_phrase_extends_list() {
        let prompt = PhrasePrompt::package_upgrade().with_phrase("Continue upgrade");
        assert!(prompt.looks_like_confirmation("Continue upgrade? [y/n]"));
        assert!(prompt.looks_like_confirmation("Do you want to upgrade?"));
    }

    #[test]
    fn test_closure_predicate() {
        let prompt = |text: &str| text.ends_with('?');
        assert!(prompt.looks_like_confirmation("proceed?"));
        assert!(!prompt.looks_like_confirmation("done"));
    }

    #[test]
    fn test_compile_prompt_pattern() {
        let pattern = compile_prompt_pattern(r"\[y/n\]").unwrap();
        assert!(pattern.is_match(b"Do you really want to upgrade firmware? [y/n] "));
        assert!(pattern.find_match(b"[y/n]").is_some());

        let pattern = compile_prompt_pattern(r"#$").unwrap();
        assert!(pattern.is_match(b"router#"));
    }
}
