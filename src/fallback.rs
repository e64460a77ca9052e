//! Canned replies used when the model server cannot be reached.

use regex::Regex;

use crate::error::{CoachError, Result};

pub const OFFLINE_SUFFIX: &str = " (Offline mode - Ollama unavailable)";
pub const DEFAULT_REPLY: &str = "I'm here to help with your workout! Keep up the great work!";

const RULES: &[(&str, &str)] = &[
    ("hi", "Hi there! I'm your AI coach. Ready to work out?"),
    ("hello", "Hello! Great to see you. Let's get moving!"),
    (
        "how are you",
        "I'm doing great and ready to help you with your workout!",
    ),
    (
        "help",
        "I'm here to help! I can guide you through exercises and give form feedback.",
    ),
    (
        "form",
        "Your form is looking good! Keep focusing on proper posture.",
    ),
    (
        "squat",
        "For squats, keep your feet shoulder-width apart and go down like you're sitting in a chair.",
    ),
];

/// Ordered keyword table. The first rule whose phrase starts a word in the
/// message wins, so "squats" hits the squat rule but "this" misses "hi".
#[derive(Debug, Clone)]
pub struct FallbackRules {
    rules: Vec<(Regex, &'static str)>,
    default_reply: &'static str,
}

impl FallbackRules {
    pub fn new() -> Result<Self> {
        let rules = RULES
            .iter()
            .map(|(phrase, reply)| {
                let pattern = format!(r"(?i)\b{}", regex::escape(phrase).replace(' ', r"\s+"));
                Regex::new(&pattern)
                    .map(|re| (re, *reply))
                    .map_err(|e| CoachError::Internal {
                        message: format!("bad fallback pattern '{}': {}", phrase, e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            default_reply: DEFAULT_REPLY,
        })
    }

    pub fn respond(&self, message: &str) -> &'static str {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(message))
            .map(|(_, reply)| *reply)
            .unwrap_or(self.default_reply)
    }

    /// Reply text with the offline marker appended
    pub fn offline_reply(&self, message: &str) -> String {
        format!("{}{}", self.respond(message), OFFLINE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = FallbackRules::new().unwrap();
        assert_eq!(
            rules.respond("Hi, can you check my squat form?"),
            "Hi there! I'm your AI coach. Ready to work out?"
        );
        assert_eq!(
            rules.respond("my FORM on the squat"),
            "Your form is looking good! Keep focusing on proper posture."
        );
    }

    #[test]
    fn test_plural_keyword_matches() {
        let rules = FallbackRules::new().unwrap();
        assert_eq!(
            rules.respond("how do I do squats?"),
            "For squats, keep your feet shoulder-width apart and go down like you're sitting in a chair."
        );
        assert_eq!(
            rules.respond("check my forms please"),
            "Your form is looking good! Keep focusing on proper posture."
        );
        assert_eq!(
            rules.respond("any helpful tips"),
            "I'm here to help! I can guide you through exercises and give form feedback."
        );
    }

    #[test]
    fn test_keyword_must_start_a_word() {
        let rules = FallbackRules::new().unwrap();
        // "this" and "which" contain "hi" but are not greetings
        assert_eq!(rules.respond("which is this"), DEFAULT_REPLY);
        assert_eq!(
            rules.respond("How   are you today"),
            "I'm doing great and ready to help you with your workout!"
        );
    }

    #[test]
    fn test_offline_reply_has_marker() {
        let rules = FallbackRules::new().unwrap();
        assert_eq!(
            rules.offline_reply("anything"),
            format!("{}{}", DEFAULT_REPLY, OFFLINE_SUFFIX)
        );
    }
}
