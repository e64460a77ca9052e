use std::time::{Duration, Instant};

/// Default minimum spacing between feedback dispatches
pub const DEFAULT_FEEDBACK_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Idle,
    AwaitingFeedback,
}

/// Rate gate for narrated form feedback.
///
/// At most one request is in flight, and a new one never starts sooner than
/// `min_interval` after the previous one started. Frames that arrive while a
/// request is pending are dropped, not queued.
#[derive(Debug, Clone)]
pub struct FeedbackCadence {
    min_interval: Duration,
    last_dispatch: Option<Instant>,
    state: FeedbackState,
}

impl FeedbackCadence {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: None,
            state: FeedbackState::Idle,
        }
    }

    /// Claim a dispatch slot for this frame.
    ///
    /// Returns `true` and enters `AwaitingFeedback` when the caller should
    /// send feedback now.
    pub fn try_dispatch(&mut self, now: Instant, workout_active: bool) -> bool {
        if !workout_active || self.state == FeedbackState::AwaitingFeedback {
            return false;
        }
        if let Some(last) = self.last_dispatch
            && now.saturating_duration_since(last) < self.min_interval
        {
            return false;
        }
        self.state = FeedbackState::AwaitingFeedback;
        self.last_dispatch = Some(now);
        true
    }

    /// The outstanding request finished, successfully or not
    pub fn settle(&mut self) {
        self.state = FeedbackState::Idle;
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    pub fn in_flight(&self) -> bool {
        self.state == FeedbackState::AwaitingFeedback
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for FeedbackCadence {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_INTERVAL)
    }
}
