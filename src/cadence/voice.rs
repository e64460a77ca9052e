use std::time::Duration;

/// Delay before listening resumes once the coach stops talking
pub const DEFAULT_RESUME_DELAY: Duration = Duration::from_millis(500);
/// Delay before recognition restarts after it ends on its own
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(1000);

/// Speech turn state. A single enum, so speaking and listening never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
    Speaking,
}

/// Why speech input stopped with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFailure {
    /// Microphone permission denied; input is disabled for the session
    NotAllowed,
    NoSpeech,
    Network,
    AudioCapture,
    Other,
}

impl InputFailure {
    /// Status text shown to the user, if the failure is worth surfacing
    pub fn status_message(self) -> Option<&'static str> {
        match self {
            Self::NotAllowed => Some(
                "Microphone access denied. Please allow microphone access in your browser settings and refresh the page.",
            ),
            Self::Network => Some(
                "Network error with speech recognition. Please check your connection.",
            ),
            Self::AudioCapture => Some("Could not capture audio. Please check your microphone."),
            Self::NoSpeech | Self::Other => None,
        }
    }
}

/// Outcome of asking to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputGrant {
    /// Already speaking; the utterance is skipped
    Refused,
    /// Speak now. `stop_input` asks the caller to halt recognition first.
    Granted { stop_input: bool },
}

/// Turn-taking between speech output and speech input.
///
/// Transitions are driven by platform callbacks. While the coach is
/// speaking, input requests are ignored; when it finishes, listening resumes
/// after a short grace delay if a workout is running and voice is enabled.
#[derive(Debug, Clone)]
pub struct VoiceTurns {
    state: VoiceState,
    enabled: bool,
    input_available: bool,
    resume_delay: Duration,
    restart_delay: Duration,
}

impl VoiceTurns {
    pub fn new(resume_delay: Duration, restart_delay: Duration) -> Self {
        Self {
            state: VoiceState::Idle,
            enabled: false,
            input_available: true,
            resume_delay,
            restart_delay,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.state == VoiceState::Speaking
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn input_available(&self) -> bool {
        self.input_available
    }

    /// User toggle. Disabling does not stop an active recognition by itself;
    /// the caller decides whether to stop input.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled && self.input_available;
    }

    /// Ask to start speech input. Returns `true` if input should start now.
    pub fn request_input(&mut self) -> bool {
        if self.state != VoiceState::Idle || !self.enabled || !self.input_available {
            tracing::debug!(state = ?self.state, enabled = self.enabled, "input request ignored");
            return false;
        }
        self.state = VoiceState::Listening;
        true
    }

    /// Ask to stop speech input. Returns `true` if input was active.
    pub fn stop_input(&mut self) -> bool {
        if self.state == VoiceState::Listening {
            self.state = VoiceState::Idle;
            return true;
        }
        false
    }

    pub fn begin_output(&mut self) -> OutputGrant {
        match self.state {
            VoiceState::Speaking => OutputGrant::Refused,
            VoiceState::Listening => {
                self.state = VoiceState::Speaking;
                OutputGrant::Granted { stop_input: true }
            }
            VoiceState::Idle => {
                self.state = VoiceState::Speaking;
                OutputGrant::Granted { stop_input: false }
            }
        }
    }

    /// Speech output finished. Returns the delay after which listening
    /// should resume, if it should.
    pub fn output_ended(&mut self, workout_active: bool) -> Option<Duration> {
        if self.state != VoiceState::Speaking {
            return None;
        }
        self.state = VoiceState::Idle;
        (workout_active && self.enabled && self.input_available).then_some(self.resume_delay)
    }

    /// Speech output errored; no automatic resume
    pub fn output_failed(&mut self) {
        if self.state == VoiceState::Speaking {
            self.state = VoiceState::Idle;
        }
    }

    /// Recognition ended on its own. Returns the restart delay if it should
    /// restart.
    pub fn input_ended(&mut self, workout_active: bool) -> Option<Duration> {
        match self.state {
            // stopped so the coach could talk; output_ended handles resume
            VoiceState::Speaking => None,
            VoiceState::Listening | VoiceState::Idle => {
                self.state = VoiceState::Idle;
                (workout_active && self.enabled && self.input_available)
                    .then_some(self.restart_delay)
            }
        }
    }

    pub fn input_failed(&mut self, failure: InputFailure) {
        if failure == InputFailure::NotAllowed {
            self.input_available = false;
            self.enabled = false;
        }
        if self.state == VoiceState::Listening {
            self.state = VoiceState::Idle;
        }
    }

    /// Speech input is not supported on this platform at all
    pub fn mark_unavailable(&mut self) {
        self.input_available = false;
        self.enabled = false;
        if self.state == VoiceState::Listening {
            self.state = VoiceState::Idle;
        }
    }
}

impl Default for VoiceTurns {
    fn default() -> Self {
        Self::new(DEFAULT_RESUME_DELAY, DEFAULT_RESTART_DELAY)
    }
}
