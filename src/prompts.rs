//! Versioned prompt templates for the local model.
//!
//! Each prompt carries a stable id and a SHA-1 checksum of its template so
//! logs can tell exactly which wording produced a reply. Templates use
//! `{{name}}` placeholders; rendering is plain substitution.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::conversation::Turn;
use crate::error::Result;
use crate::pose::FormMetrics;

pub const ASSISTANT_PROMPT: &str = "coach-assistant-v1";
pub const FEEDBACK_CONVERSATIONAL_PROMPT: &str = "coach-feedback-conversational-v1";
pub const FEEDBACK_TIP_PROMPT: &str = "coach-feedback-tip-v1";

/// Conversation entries forwarded to the model with each question
pub const CONTEXT_WINDOW: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    /// Stable identifier (format: category-name-v1)
    pub id: String,
    pub one_liner: String,
    /// Placeholder names with a short description each
    pub inputs: HashMap<String, String>,
    pub checksum: String,
    pub template: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        one_liner: impl Into<String>,
        template: impl Into<String>,
        inputs: HashMap<String, String>,
    ) -> Self {
        let template = template.into();
        let checksum = sha1_checksum(&template);
        Self {
            id: id.into(),
            one_liner: one_liner.into(),
            inputs,
            checksum,
            template,
        }
    }

    /// Substitute `{{name}}` placeholders. Unknown placeholders are left as is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.template.clone();
        for (name, value) in vars {
            out = out.replace(&format!("{{{{{}}}}}", name), value);
        }
        out
    }
}

fn sha1_checksum(content: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Arc<Prompt>>,
}

impl PromptRegistry {
    /// Registry preloaded with the coach prompts
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_core_prompts();
        registry
    }

    pub fn register(&mut self, prompt: Prompt) {
        self.prompts.insert(prompt.id.clone(), Arc::new(prompt));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Prompt>> {
        self.prompts.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Prompt>> {
        let mut prompts: Vec<_> = self.prompts.values().cloned().collect();
        prompts.sort_by(|a, b| a.id.cmp(&b.id));
        prompts
    }

    fn require(&self, id: &str) -> Result<Arc<Prompt>> {
        self.get(id).ok_or_else(|| crate::error::CoachError::NotFound {
            message: format!("prompt '{}' is not registered", id),
        })
    }

    /// Prompt for a free-form question, with the tail of the conversation
    pub fn assistant_prompt(
        &self,
        message: &str,
        context: &[Turn],
        exercise: &str,
        workout_active: bool,
    ) -> Result<String> {
        let prompt = self.require(ASSISTANT_PROMPT)?;
        let start = context.len().saturating_sub(CONTEXT_WINDOW);
        let recent = serde_json::to_string(&context[start..])?;
        let active = workout_active.to_string();
        Ok(prompt.render(&[
            ("workout_active", &active),
            ("exercise", exercise),
            ("context", &recent),
            ("message", message),
        ]))
    }

    /// Prompt for form feedback on one metrics snapshot
    pub fn feedback_prompt(
        &self,
        metrics: &FormMetrics,
        exercise: &str,
        conversational: bool,
    ) -> Result<String> {
        let id = if conversational {
            FEEDBACK_CONVERSATIONAL_PROMPT
        } else {
            FEEDBACK_TIP_PROMPT
        };
        let prompt = self.require(id)?;
        let metrics = serde_json::to_string(metrics)?;
        Ok(prompt.render(&[("exercise", exercise), ("metrics", &metrics)]))
    }

    fn register_core_prompts(&mut self) {
        self.register(Prompt::new(
            ASSISTANT_PROMPT,
            "Conversational coach persona answering the user",
            "You are Pi, an AI personal fitness coach with a warm, encouraging, and conversational personality.

Key traits:
- Speak naturally and conversationally, like a supportive friend
- Use short, clear sentences that flow naturally when spoken
- Be encouraging and motivational without being overly enthusiastic
- Show genuine interest in the user's progress and wellbeing
- Use \"I\" statements and personal connection (\"I can see\", \"I'm proud of you\")
- Ask follow-up questions to keep the conversation engaging
- Give specific, actionable advice when needed

Current context:
- Workout active: {{workout_active}}
- Current exercise: {{exercise}}
- Recent conversation: {{context}}

Your goals:
1. Guide workouts with clear, encouraging instructions
2. Provide real-time form feedback and corrections
3. Motivate and celebrate progress
4. Help with workout planning and goal setting
5. Answer fitness-related questions
6. Log workouts and track progress

Communication style:
- Keep responses conversational and natural (2-3 sentences max)
- Use contractions and casual language
- Be supportive but not patronizing
- Focus on being helpful and actionable

User message: {{message}}

Respond as Pi the fitness coach:",
            [
                ("workout_active".into(), "Whether a workout is running".into()),
                ("exercise".into(), "Current exercise name".into()),
                ("context".into(), "Last few conversation turns as JSON".into()),
                ("message".into(), "The user's message".into()),
            ]
            .into(),
        ));

        self.register(Prompt::new(
            FEEDBACK_CONVERSATIONAL_PROMPT,
            "Spoken real-time form feedback, one or two sentences",
            "You are Pi, a friendly AI fitness coach. The user is doing {{exercise}}s.

Their current form metrics: {{metrics}}

Give real-time conversational feedback in Pi's style:
- Use encouraging, supportive tone
- Keep it short (1-2 sentences max)
- Be specific about what you see
- Use natural, conversational language
- Mix encouragement with gentle corrections

Examples of good responses:
\"Nice depth on that squat! Try to keep your knees tracking over your toes.\"
\"Great job! I can see you're really focusing on your form.\"
\"Almost there! Just straighten up your back a little more.\"

Respond as if you're right there coaching them.",
            [
                ("exercise".into(), "Exercise being performed".into()),
                ("metrics".into(), "Form metrics snapshot as JSON".into()),
            ]
            .into(),
        ));

        self.register(Prompt::new(
            FEEDBACK_TIP_PROMPT,
            "Single concise form tip",
            "You are a friendly AI coach. The user did a {{exercise}}. Their metrics: {{metrics}}. Give one concise tip to improve form.",
            [
                ("exercise".into(), "Exercise being performed".into()),
                ("metrics".into(), "Form metrics snapshot as JSON".into()),
            ]
            .into(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> FormMetrics {
        FormMetrics {
            left_knee_angle: 95.0,
            right_knee_angle: 97.0,
            back_angle: 160.0,
            hip_width: 40.0,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_core_prompts_registered_with_checksums() {
        let registry = PromptRegistry::new();
        let ids: Vec<_> = registry.list().iter().map(|p| p.id.clone()).collect();
        assert_eq!(
            ids,
            vec![ASSISTANT_PROMPT, FEEDBACK_CONVERSATIONAL_PROMPT, FEEDBACK_TIP_PROMPT]
        );
        for prompt in registry.list() {
            assert_eq!(prompt.checksum.len(), 40);
        }
    }

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let prompt = Prompt::new("t", "t", "{{a}} and {{a}} but {{b}}", HashMap::new());
        assert_eq!(prompt.render(&[("a", "x")]), "x and x but {{b}}");
    }

    #[test]
    fn test_assistant_prompt_keeps_last_four_turns() {
        let registry = PromptRegistry::new();
        let context: Vec<Turn> = (0..6).map(|i| Turn::user(format!("msg{}", i))).collect();
        let text = registry
            .assistant_prompt("how deep?", &context, "squat", true)
            .unwrap();
        assert!(!text.contains("msg1"));
        assert!(text.contains("msg2"));
        assert!(text.contains("msg5"));
        assert!(text.contains("Workout active: true"));
        assert!(text.contains("User message: how deep?"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_feedback_prompt_is_deterministic() {
        let registry = PromptRegistry::new();
        let a = registry.feedback_prompt(&metrics(), "squat", true).unwrap();
        let b = registry.feedback_prompt(&metrics(), "squat", true).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("doing squats"));
        assert!(a.contains("\"leftKneeAngle\":95.0"));
    }

    #[test]
    fn test_tip_prompt_used_when_not_conversational() {
        let registry = PromptRegistry::new();
        let text = registry.feedback_prompt(&metrics(), "lunge", false).unwrap();
        assert!(text.starts_with("You are a friendly AI coach. The user did a lunge."));
    }

    #[test]
    fn test_missing_prompt_is_not_found() {
        let registry = PromptRegistry::default();
        assert!(registry.feedback_prompt(&metrics(), "squat", false).is_err());
    }
}
