//! Client-side coordination: feedback cadence, speech turn-taking and the
//! event loop that ties frames, speech callbacks and network replies together.

pub mod coordinator;
pub mod feedback;
pub mod runtime;
pub mod voice;

pub use coordinator::{CoachEvent, CoachSettings, Coordinator, Effect, WorkoutState};
pub use feedback::{FeedbackCadence, FeedbackState};
pub use runtime::{AssistantReply, AssistantRequest, CoachBackend, CoachRuntime, Platform};
pub use voice::{InputFailure, OutputGrant, VoiceState, VoiceTurns};
