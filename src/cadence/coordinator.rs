//! Single-threaded transition function for the coaching client.
//!
//! Every platform callback, timer and network completion arrives as a
//! [`CoachEvent`]. [`Coordinator::handle`] updates state and returns the
//! [`Effect`]s the runtime must carry out. Nothing here performs I/O.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::feedback::{DEFAULT_FEEDBACK_INTERVAL, FeedbackCadence};
use super::voice::{
    DEFAULT_RESTART_DELAY, DEFAULT_RESUME_DELAY, InputFailure, OutputGrant, VoiceTurns,
};
use crate::conversation::{ConversationHistory, Role, Turn};
use crate::overlay::{self, Overlay};
use crate::pose::{HipWidthPolicy, MetricsExtractor, Pose};
use crate::schemas::{AssistantRequest, AssistantResponse, DEFAULT_EXERCISE, FeedbackRequest};

pub const APOLOGY: &str = "Sorry, I didn't catch that. Could you try again?";
pub const WORKOUT_GREETING: &str = "Great! Let's start your workout. I'll guide you through some squats. Stand with your feet shoulder-width apart and let's begin!";
pub const WORKOUT_CLOSING: &str = "Great job! Your workout is complete. You did amazing today!";
pub const WORKOUT_START_FAILED: &str =
    "Sorry, there was an error starting your workout. Please try again.";

/// Tunables for the coordinator
#[derive(Debug, Clone)]
pub struct CoachSettings {
    pub feedback_interval: Duration,
    pub resume_delay: Duration,
    pub restart_delay: Duration,
    /// Pause between the workout greeting and the first listen
    pub start_listen_delay: Duration,
    pub hip_width: HipWidthPolicy,
    pub exercise: String,
    pub conversational: bool,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            feedback_interval: DEFAULT_FEEDBACK_INTERVAL,
            resume_delay: DEFAULT_RESUME_DELAY,
            restart_delay: DEFAULT_RESTART_DELAY,
            start_listen_delay: Duration::from_millis(2000),
            hip_width: HipWidthPolicy::default(),
            exercise: DEFAULT_EXERCISE.to_string(),
            conversational: true,
        }
    }
}

impl From<&crate::config::CoachingConfig> for CoachSettings {
    fn from(cfg: &crate::config::CoachingConfig) -> Self {
        Self {
            feedback_interval: Duration::from_millis(cfg.feedback_interval_ms),
            resume_delay: Duration::from_millis(cfg.speech_resume_delay_ms),
            restart_delay: Duration::from_millis(cfg.listen_restart_delay_ms),
            start_listen_delay: Duration::from_millis(cfg.start_listen_delay_ms),
            hip_width: if cfg.hip_width_gated {
                HipWidthPolicy::ConfidenceGated
            } else {
                HipWidthPolicy::Ungated
            },
            exercise: cfg.default_exercise.clone(),
            conversational: cfg.conversational_feedback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutState {
    Inactive,
    /// Waiting for the server to hand out a session id
    Starting,
    Active {
        session_id: i64,
    },
}

impl WorkoutState {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkoutState::Active { .. })
    }
}

#[derive(Debug, Clone)]
pub enum CoachEvent {
    /// One processed camera frame; `None` when no subject was detected
    Frame { pose: Option<Pose> },
    FeedbackSettled(Result<String, String>),
    StartWorkout,
    EndWorkout,
    SessionOpened { session_id: i64 },
    SessionOpenFailed(String),
    SetVoiceEnabled(bool),
    SetExercise(String),
    /// The platform has no speech recognition at all
    InputUnavailable,
    InputStarted,
    InputEnded,
    InputFailed(InputFailure),
    OutputStarted,
    OutputEnded,
    OutputFailed,
    Transcript(String),
    AssistantReplied(AssistantResponse),
    AssistantFailed(String),
    /// Timer fired after a grace or restart delay
    ResumeListening,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Render(Overlay),
    DispatchFeedback(FeedbackRequest),
    AskAssistant(AssistantRequest),
    Speak(String),
    StartInput,
    StopInput,
    /// Post [`CoachEvent::ResumeListening`] after the delay
    ResumeListeningAfter(Duration),
    OpenSession,
    CloseSession { session_id: i64, summary: String },
    ShowMessage { role: Role, text: String },
    Status(String),
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    settings: CoachSettings,
    extractor: MetricsExtractor,
    workout: WorkoutState,
    feedback: FeedbackCadence,
    voice: VoiceTurns,
    history: ConversationHistory,
    exercise: String,
}

impl Coordinator {
    pub fn new(settings: CoachSettings) -> Self {
        Self {
            extractor: MetricsExtractor::new(settings.hip_width),
            feedback: FeedbackCadence::new(settings.feedback_interval),
            voice: VoiceTurns::new(settings.resume_delay, settings.restart_delay),
            exercise: settings.exercise.clone(),
            workout: WorkoutState::Inactive,
            history: ConversationHistory::new(),
            settings,
        }
    }

    pub fn workout(&self) -> WorkoutState {
        self.workout
    }

    pub fn feedback(&self) -> &FeedbackCadence {
        &self.feedback
    }

    pub fn voice(&self) -> &VoiceTurns {
        &self.voice
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn exercise(&self) -> &str {
        &self.exercise
    }

    pub fn handle(&mut self, event: CoachEvent, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            CoachEvent::Frame { pose } => self.on_frame(pose, now, &mut effects),
            CoachEvent::FeedbackSettled(result) => {
                self.feedback.settle();
                match result {
                    Ok(text) if self.voice.is_speaking() => {
                        debug!("dropping feedback while speaking: {}", text);
                    }
                    Ok(text) => self.speak(text, &mut effects),
                    Err(e) => warn!("feedback request failed: {}", e),
                }
            }
            CoachEvent::StartWorkout => {
                if self.workout == WorkoutState::Inactive {
                    self.workout = WorkoutState::Starting;
                    effects.push(Effect::OpenSession);
                }
            }
            CoachEvent::SessionOpened { session_id } => {
                if self.workout == WorkoutState::Starting {
                    info!(session_id, "workout started");
                    self.workout = WorkoutState::Active { session_id };
                    self.speak(WORKOUT_GREETING.to_string(), &mut effects);
                    if self.voice.enabled() {
                        effects.push(Effect::ResumeListeningAfter(
                            self.settings.start_listen_delay,
                        ));
                    }
                } else {
                    // ended before the server answered
                    warn!(session_id, "session opened after workout was cancelled");
                    effects.push(Effect::CloseSession {
                        session_id,
                        summary: format!("Cancelled {} session", self.exercise),
                    });
                }
            }
            CoachEvent::SessionOpenFailed(e) => {
                warn!("failed to start workout: {}", e);
                if self.workout == WorkoutState::Starting {
                    self.workout = WorkoutState::Inactive;
                }
                self.speak(WORKOUT_START_FAILED.to_string(), &mut effects);
            }
            CoachEvent::EndWorkout => match self.workout {
                WorkoutState::Active { session_id } => {
                    info!(session_id, "workout ended");
                    self.workout = WorkoutState::Inactive;
                    if self.voice.stop_input() {
                        effects.push(Effect::StopInput);
                    }
                    effects.push(Effect::CloseSession {
                        session_id,
                        summary: format!("Completed {} session", self.exercise),
                    });
                    self.speak(WORKOUT_CLOSING.to_string(), &mut effects);
                }
                WorkoutState::Starting => self.workout = WorkoutState::Inactive,
                WorkoutState::Inactive => {}
            },
            CoachEvent::SetVoiceEnabled(true) => {
                self.voice.set_enabled(true);
                if !self.voice.input_available() {
                    effects.push(Effect::Status("Speech recognition unavailable".into()));
                } else {
                    if self.voice.request_input() {
                        effects.push(Effect::StartInput);
                    }
                    effects.push(Effect::ShowMessage {
                        role: Role::Assistant,
                        text: "Voice activated! Say something to test it out.".into(),
                    });
                }
            }
            CoachEvent::SetVoiceEnabled(false) => {
                self.voice.set_enabled(false);
                if self.voice.stop_input() {
                    effects.push(Effect::StopInput);
                }
                effects.push(Effect::Status("Voice disabled".into()));
            }
            CoachEvent::SetExercise(label) => self.exercise = label,
            CoachEvent::InputUnavailable => {
                self.voice.mark_unavailable();
                effects.push(Effect::Status(
                    "Speech recognition is not supported on this platform".into(),
                ));
            }
            CoachEvent::InputStarted => {
                if self.voice.is_listening() {
                    effects.push(Effect::Status("Listening...".into()));
                } else {
                    // recognition came up while we should not be listening
                    effects.push(Effect::StopInput);
                }
            }
            CoachEvent::InputEnded => {
                if let Some(delay) = self.voice.input_ended(self.workout.is_active()) {
                    effects.push(Effect::ResumeListeningAfter(delay));
                }
            }
            CoachEvent::InputFailed(failure) => {
                self.voice.input_failed(failure);
                if let Some(message) = failure.status_message() {
                    effects.push(Effect::Status(message.into()));
                }
            }
            CoachEvent::OutputStarted => effects.push(Effect::Status("Speaking...".into())),
            CoachEvent::OutputEnded => {
                if let Some(delay) = self.voice.output_ended(self.workout.is_active()) {
                    effects.push(Effect::ResumeListeningAfter(delay));
                }
                effects.push(Effect::Status("Ready".into()));
            }
            CoachEvent::OutputFailed => {
                self.voice.output_failed();
                effects.push(Effect::Status("Speech error".into()));
            }
            CoachEvent::ResumeListening => {
                // timers set during a workout may fire after it ended
                if self.workout.is_active() && self.voice.request_input() {
                    effects.push(Effect::StartInput);
                }
            }
            CoachEvent::Transcript(text) => {
                let text = text.trim();
                if text.chars().count() > 1 {
                    effects.push(Effect::ShowMessage {
                        role: Role::User,
                        text: text.to_string(),
                    });
                    self.history.push(Turn::user(text));
                    effects.push(Effect::AskAssistant(AssistantRequest {
                        message: text.to_string(),
                        context: self.history.turns().to_vec(),
                        exercise: self.exercise.clone(),
                        workout_active: self.workout.is_active(),
                    }));
                }
            }
            CoachEvent::AssistantReplied(reply) => {
                self.history.push(Turn::assistant(reply.response.clone()));
                if reply.offline_mode {
                    effects.push(Effect::ShowMessage {
                        role: Role::Assistant,
                        text: reply.response,
                    });
                } else {
                    self.speak(reply.response, &mut effects);
                }
            }
            CoachEvent::AssistantFailed(e) => {
                warn!("assistant request failed: {}", e);
                self.speak(APOLOGY.to_string(), &mut effects);
            }
            CoachEvent::Shutdown => {}
        }
        effects
    }

    fn on_frame(&mut self, pose: Option<Pose>, now: Instant, effects: &mut Vec<Effect>) {
        let Some(pose) = pose.filter(|p| !p.is_empty()) else {
            effects.push(Effect::Render(overlay::compose(None, None)));
            return;
        };

        let metrics = self.extractor.extract(&pose);
        effects.push(Effect::Render(overlay::compose(Some(&pose), Some(&metrics))));

        if self.feedback.try_dispatch(now, self.workout.is_active()) {
            effects.push(Effect::DispatchFeedback(FeedbackRequest {
                metrics,
                exercise_type: self.exercise.clone(),
                conversational: self.settings.conversational,
            }));
        }
    }

    fn speak(&mut self, text: String, effects: &mut Vec<Effect>) {
        match self.voice.begin_output() {
            OutputGrant::Refused => debug!("already speaking, skipping: {}", text),
            OutputGrant::Granted { stop_input } => {
                if stop_input {
                    effects.push(Effect::StopInput);
                }
                effects.push(Effect::Speak(text));
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoachSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::VoiceState;
    use crate::pose::{Keypoint, Landmark};

    fn pose() -> Pose {
        Pose::new(
            (0..Landmark::COUNT)
                .map(|i| Keypoint::new(100.0 + i as f32, 10.0 * i as f32, 0.9))
                .collect(),
        )
    }

    fn frame() -> CoachEvent {
        CoachEvent::Frame { pose: Some(pose()) }
    }

    fn active(coord: &mut Coordinator, now: Instant) {
        coord.handle(CoachEvent::StartWorkout, now);
        coord.handle(CoachEvent::SessionOpened { session_id: 7 }, now);
        coord.handle(CoachEvent::OutputEnded, now);
    }

    fn dispatches(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::DispatchFeedback(_)))
            .count()
    }

    #[test]
    fn test_frame_renders_before_dispatch() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        active(&mut coord, now);
        let effects = coord.handle(frame(), now);
        assert!(matches!(effects[0], Effect::Render(Overlay::Skeleton { .. })));
        assert!(matches!(effects[1], Effect::DispatchFeedback(_)));
    }

    #[test]
    fn test_no_subject_renders_placeholder_without_dispatch() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        active(&mut coord, now);
        let effects = coord.handle(CoachEvent::Frame { pose: None }, now);
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Render(Overlay::NoSubject { .. })));
        assert!(!coord.feedback().in_flight());
    }

    #[test]
    fn test_no_dispatch_without_workout() {
        let mut coord = Coordinator::default();
        let effects = coord.handle(frame(), Instant::now());
        assert_eq!(dispatches(&effects), 0);
    }

    #[test]
    fn test_in_flight_feedback_drops_frames() {
        let mut coord = Coordinator::default();
        let start = Instant::now();
        active(&mut coord, start);
        assert_eq!(dispatches(&coord.handle(frame(), start)), 1);
        let later = start + Duration::from_secs(30);
        assert_eq!(dispatches(&coord.handle(frame(), later)), 0);

        coord.handle(CoachEvent::FeedbackSettled(Err("timeout".into())), later);
        assert_eq!(dispatches(&coord.handle(frame(), later)), 1);
    }

    #[test]
    fn test_feedback_spoken_unless_already_speaking() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        active(&mut coord, now);
        coord.handle(frame(), now);
        let effects = coord.handle(CoachEvent::FeedbackSettled(Ok("Nice depth!".into())), now);
        assert_eq!(effects, vec![Effect::Speak("Nice depth!".into())]);

        // still speaking: next feedback is dropped
        coord.handle(frame(), now + Duration::from_secs(6));
        let effects = coord.handle(CoachEvent::FeedbackSettled(Ok("Again!".into())), now);
        assert!(effects.is_empty());
        assert!(!coord.feedback().in_flight());
    }

    #[test]
    fn test_workout_start_greets_and_schedules_listening() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::SetVoiceEnabled(true), now);
        assert_eq!(coord.voice().state(), VoiceState::Listening);

        assert_eq!(coord.handle(CoachEvent::StartWorkout, now), vec![Effect::OpenSession]);
        let effects = coord.handle(CoachEvent::SessionOpened { session_id: 3 }, now);
        assert_eq!(
            effects,
            vec![
                Effect::StopInput,
                Effect::Speak(WORKOUT_GREETING.into()),
                Effect::ResumeListeningAfter(Duration::from_millis(2000)),
            ]
        );
        assert_eq!(coord.workout(), WorkoutState::Active { session_id: 3 });

        // the timer fires while still speaking: no-op
        assert!(coord.handle(CoachEvent::ResumeListening, now).is_empty());

        let effects = coord.handle(CoachEvent::OutputEnded, now);
        assert!(effects.contains(&Effect::ResumeListeningAfter(DEFAULT_RESUME_DELAY)));
        assert_eq!(
            coord.handle(CoachEvent::ResumeListening, now),
            vec![Effect::StartInput]
        );
        assert_eq!(coord.voice().state(), VoiceState::Listening);
    }

    #[test]
    fn test_end_workout_closes_session_and_stops_dispatch() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::SetVoiceEnabled(true), now);
        active(&mut coord, now);
        coord.handle(CoachEvent::ResumeListening, now);
        assert!(coord.voice().is_listening());

        let effects = coord.handle(CoachEvent::EndWorkout, now);
        assert_eq!(
            effects,
            vec![
                Effect::StopInput,
                Effect::CloseSession {
                    session_id: 7,
                    summary: "Completed squat session".into()
                },
                Effect::Speak(WORKOUT_CLOSING.into()),
            ]
        );
        assert_eq!(dispatches(&coord.handle(frame(), now + Duration::from_secs(10))), 0);
        // speech ends after the workout: no resume
        let effects = coord.handle(CoachEvent::OutputEnded, now);
        assert_eq!(effects, vec![Effect::Status("Ready".into())]);
    }

    #[test]
    fn test_pending_feedback_survives_workout_end() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        active(&mut coord, now);
        coord.handle(frame(), now);
        coord.handle(CoachEvent::EndWorkout, now);
        coord.handle(CoachEvent::OutputEnded, now);
        // the late reply is still narrated; it is not cancelled
        let effects = coord.handle(CoachEvent::FeedbackSettled(Ok("Good set".into())), now);
        assert_eq!(effects, vec![Effect::Speak("Good set".into())]);
    }

    #[test]
    fn test_transcript_round_trip_updates_history() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        let effects = coord.handle(CoachEvent::Transcript("  how low should I go? ".into()), now);
        match &effects[1] {
            Effect::AskAssistant(req) => {
                assert_eq!(req.message, "how low should I go?");
                assert_eq!(req.context.len(), 1);
                assert!(!req.workout_active);
            }
            other => panic!("unexpected effect {:?}", other),
        }

        let effects = coord.handle(
            CoachEvent::AssistantReplied(AssistantResponse {
                response: "Aim for thighs parallel.".into(),
                offline_mode: false,
            }),
            now,
        );
        assert_eq!(effects, vec![Effect::Speak("Aim for thighs parallel.".into())]);
        assert_eq!(coord.history().len(), 2);
    }

    #[test]
    fn test_short_transcript_ignored() {
        let mut coord = Coordinator::default();
        assert!(coord.handle(CoachEvent::Transcript("a".into()), Instant::now()).is_empty());
        assert!(coord.history().is_empty());
    }

    #[test]
    fn test_offline_reply_is_shown_not_spoken() {
        let mut coord = Coordinator::default();
        let effects = coord.handle(
            CoachEvent::AssistantReplied(AssistantResponse {
                response: "Keep going (Offline mode - Ollama unavailable)".into(),
                offline_mode: true,
            }),
            Instant::now(),
        );
        assert!(matches!(effects[0], Effect::ShowMessage { role: Role::Assistant, .. }));
        assert!(!coord.voice().is_speaking());
    }

    #[test]
    fn test_assistant_failure_apologises() {
        let mut coord = Coordinator::default();
        let effects = coord.handle(CoachEvent::AssistantFailed("refused".into()), Instant::now());
        assert_eq!(effects, vec![Effect::Speak(APOLOGY.into())]);
    }

    #[test]
    fn test_input_restart_only_during_workout() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::SetVoiceEnabled(true), now);
        assert!(coord.handle(CoachEvent::InputEnded, now).is_empty());

        active(&mut coord, now);
        coord.handle(CoachEvent::ResumeListening, now);
        assert_eq!(
            coord.handle(CoachEvent::InputEnded, now),
            vec![Effect::ResumeListeningAfter(DEFAULT_RESTART_DELAY)]
        );
    }

    #[test]
    fn test_restart_timer_after_workout_end_stays_idle() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::SetVoiceEnabled(true), now);
        active(&mut coord, now);
        coord.handle(CoachEvent::ResumeListening, now);
        assert_eq!(
            coord.handle(CoachEvent::InputEnded, now),
            vec![Effect::ResumeListeningAfter(DEFAULT_RESTART_DELAY)]
        );

        coord.handle(CoachEvent::EndWorkout, now);
        coord.handle(CoachEvent::OutputFailed, now);
        // the restart timer set during the workout fires now
        assert!(coord.handle(CoachEvent::ResumeListening, now).is_empty());
        assert_eq!(coord.voice().state(), VoiceState::Idle);
    }

    #[test]
    fn test_permission_denied_surfaces_status() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::SetVoiceEnabled(true), now);
        let effects = coord.handle(CoachEvent::InputFailed(InputFailure::NotAllowed), now);
        assert!(matches!(effects[0], Effect::Status(_)));
        assert!(!coord.voice().input_available());
    }

    #[test]
    fn test_late_session_is_closed() {
        let mut coord = Coordinator::default();
        let now = Instant::now();
        coord.handle(CoachEvent::StartWorkout, now);
        coord.handle(CoachEvent::EndWorkout, now);
        let effects = coord.handle(CoachEvent::SessionOpened { session_id: 11 }, now);
        assert!(matches!(effects[0], Effect::CloseSession { session_id: 11, .. }));
        assert_eq!(coord.workout(), WorkoutState::Inactive);
    }
}
