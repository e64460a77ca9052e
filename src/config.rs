use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration structure loaded from pose_coach.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub coaching: CoachingConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP listener and static asset settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory served for any path the API does not claim
    pub static_dir: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: Some("public".to_string()),
            request_timeout_ms: 30_000,
        }
    }
}

/// Local model server (Ollama generate API)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 150,
            stop: vec!["\n\n".to_string(), "User:".to_string(), "Human:".to_string()],
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; `:memory:` keeps everything in RAM
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "workouts.db".to_string(),
        }
    }
}

/// Client-side cadence and turn-taking tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoachingConfig {
    pub feedback_interval_ms: u64,
    pub speech_resume_delay_ms: u64,
    pub listen_restart_delay_ms: u64,
    pub start_listen_delay_ms: u64,
    /// Apply the keypoint confidence threshold to hip width as well
    pub hip_width_gated: bool,
    pub default_exercise: String,
    pub conversational_feedback: bool,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            feedback_interval_ms: 5000,
            speech_resume_delay_ms: 500,
            listen_restart_delay_ms: 1000,
            start_listen_delay_ms: 2000,
            hip_width_gated: false,
            default_exercise: crate::schemas::DEFAULT_EXERCISE.to_string(),
            conversational_feedback: true,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "pose_coach=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var("RUST_LOG")
            && !level.trim().is_empty()
        {
            cfg.log_level = level;
        }
        cfg
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses POSE_COACH_CONFIG or defaults to "pose_coach.toml".
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("POSE_COACH_CONFIG").unwrap_or_else(|_| "pose_coach.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(config_path: &str) -> anyhow::Result<Self> {
        // 1) COACH_ENV_FILE if set, 2) ./.env
        if let Ok(env_path) = std::env::var("COACH_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();

        Ok(config)
    }

    /// Env-first overrides for deployment knobs
    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(bind) = std::env::var("COACH_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid COACH_BIND '{}': {}", bind, e))?;
            tracing::debug!("COACH_BIND env override applied");
        } else if let Some(port) = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            self.server.bind.set_port(port);
            tracing::debug!("PORT env override applied");
        }
        if let Ok(dir) = std::env::var("COACH_STATIC_DIR") {
            self.server.static_dir = if dir.is_empty() { None } else { Some(dir) };
        }
        if let Ok(path) = std::env::var("COACH_DB_PATH") {
            self.storage.database_path = path;
        }
        if let Ok(url) = std::env::var("COACH_OLLAMA_URL") {
            self.model.endpoint = url;
        }
        if let Ok(model) = std::env::var("COACH_MODEL") {
            self.model.model = model;
        }
        if let Some(ms) = std::env::var("COACH_MODEL_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.model.timeout_ms = ms;
        }
        if let Some(ms) = std::env::var("COACH_FEEDBACK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.coaching.feedback_interval_ms = ms;
        }
        if let Ok(gated) = std::env::var("COACH_HIP_WIDTH_GATED") {
            self.coaching.hip_width_gated = gated == "1" || gated.eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    /// Clamp out-of-range values, warning about each fix
    pub fn validate(&mut self) {
        if !self.model.endpoint.starts_with("http://") && !self.model.endpoint.starts_with("https://")
        {
            tracing::warn!(
                "Model endpoint '{}' doesn't start with http:// or https://",
                self.model.endpoint
            );
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            tracing::warn!(
                "temperature {} outside 0.0-2.0, clamping",
                self.model.temperature
            );
            self.model.temperature = self.model.temperature.clamp(0.0, 2.0);
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            tracing::warn!("top_p {} outside 0.0-1.0, clamping", self.model.top_p);
            self.model.top_p = self.model.top_p.clamp(0.0, 1.0);
        }
        if self.model.max_tokens == 0 {
            self.model.max_tokens = 1;
        }
        if self.model.timeout_ms < 100 {
            tracing::warn!("model timeout {}ms too low, using 100ms", self.model.timeout_ms);
            self.model.timeout_ms = 100;
        }
        if self.coaching.feedback_interval_ms < 1000 {
            tracing::warn!(
                "feedback_interval_ms {} below 1000, clamping",
                self.coaching.feedback_interval_ms
            );
            self.coaching.feedback_interval_ms = 1000;
        }
        if self.coaching.default_exercise.trim().is_empty() {
            self.coaching.default_exercise = crate::schemas::DEFAULT_EXERCISE.to_string();
        }
    }
}
