//! Worker configuration
//!
//! Defines all configurable parameters for the worker: queue polling,
//! control plane and bundle store endpoints, execution environment paths,
//! provisioning engine selection and run policies.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Whether a message is acknowledged after a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPolicy {
    /// Acknowledge every message once processed, whatever the outcome.
    /// Failed runs are retried only by resubmitting a new run request.
    Always,

    /// Acknowledge successful runs only. Failed runs stay on the queue and
    /// are redelivered after its visibility timeout. Poison messages are
    /// still acknowledged.
    SuccessOnly,
}

impl FromStr for AckPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(AckPolicy::Always),
            "success-only" => Ok(AckPolicy::SuccessOnly),
            other => anyhow::bail!("unknown ack policy '{}'", other),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this worker instance
    pub worker_id: String,

    /// Control plane base URL (queue gateway, variables, configuration versions)
    pub control_plane_url: String,

    /// Blob store gateway base URL
    pub bundle_store_url: String,

    /// Bucket holding configuration bundles
    pub bundle_bucket: String,

    /// Name of the run-request queue
    pub queue_name: String,

    /// Upper bound on messages fetched per receive call
    pub max_messages: u32,

    /// Long-poll wait for each receive call
    pub wait_time: Duration,

    /// Execution environment root, exclusively owned by the current run
    pub work_dir: PathBuf,

    /// Parent of the run-owned `runway-bundles` download directory
    pub download_dir: PathBuf,

    /// Provisioning engine version every run is pinned to
    pub engine_version: String,

    /// Path of the active engine binary once a version is selected
    pub engine_binary: PathBuf,

    /// Shared install cache for engine versions; `None` disables caching
    pub engine_cache_dir: Option<PathBuf>,

    /// Version-selection tool
    pub version_switcher: String,

    /// Prefix applied to provisioning-tool variables
    pub variable_prefix: String,

    /// Deadline around a whole run
    pub run_timeout: Duration,

    pub ack_policy: AckPolicy,

    /// Run `plan` after `init`
    pub plan_enabled: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(worker_id: String, control_plane_url: String) -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);

        Self {
            worker_id,
            control_plane_url,
            bundle_store_url: "http://localhost:9000".to_string(),
            bundle_bucket: "tfc-configuration-files".to_string(),
            queue_name: "tfc-run-events".to_string(),
            max_messages: 5,
            wait_time: Duration::from_secs(10),
            work_dir: home.join("tf-config"),
            download_dir: home.clone(),
            engine_version: "1.9.6".to_string(),
            engine_binary: home.join(".bin").join("terraform"),
            engine_cache_dir: Some(PathBuf::from("/opt/tfc-cache")),
            version_switcher: "tfswitch".to_string(),
            variable_prefix: "TF_VAR_".to_string(),
            run_timeout: Duration::from_secs(1800), // 30 minutes
            ack_policy: AckPolicy::Always,
            plan_enabled: false,
        }
    }

    /// Loads the configuration from environment variables
    ///
    /// Expected environment variables:
    /// - WORKER_ID (required)
    /// - CONTROL_PLANE_URL (required)
    /// - BUNDLE_STORE_URL, BUNDLE_BUCKET, RUN_QUEUE (optional)
    /// - QUEUE_MAX_MESSAGES (optional, default: 5)
    /// - QUEUE_WAIT_SECONDS (optional, default: 10)
    /// - WORK_DIR, DOWNLOAD_DIR (optional, default: under $HOME)
    /// - ENGINE_VERSION, ENGINE_BINARY, ENGINE_CACHE_DIR, VERSION_SWITCHER (optional)
    /// - VARIABLE_PREFIX (optional, default: TF_VAR_)
    /// - RUN_TIMEOUT (optional, seconds, default: 1800)
    /// - ACK_POLICY (optional, "always" or "success-only")
    /// - PLAN_ENABLED (optional, default: false)
    ///
    /// Falls back to defaults only when a required variable is absent. A
    /// variable that is present but invalid is an error, so a typo never
    /// silently discards the other overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(|name| std::env::var(name).ok())
    }

    fn load_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = match Self::from_lookup(lookup) {
            Ok(config) => config,
            Err(ConfigError::Missing(name)) => {
                info!("{} not set, using default configuration", name);
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let worker_id = vars.required("WORKER_ID")?;
        let control_plane_url = vars.required("CONTROL_PLANE_URL")?;

        let mut config = Self::new(worker_id, control_plane_url);

        if let Some(url) = vars.string("BUNDLE_STORE_URL") {
            config.bundle_store_url = url;
        }
        if let Some(bucket) = vars.string("BUNDLE_BUCKET") {
            config.bundle_bucket = bucket;
        }
        if let Some(queue) = vars.string("RUN_QUEUE") {
            config.queue_name = queue;
        }
        if let Some(max) = vars.parse::<u32>("QUEUE_MAX_MESSAGES")? {
            config.max_messages = max;
        }
        if let Some(wait) = vars.parse::<u64>("QUEUE_WAIT_SECONDS")? {
            config.wait_time = Duration::from_secs(wait);
        }
        if let Some(dir) = vars.string("WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(dir) = vars.string("DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Some(version) = vars.string("ENGINE_VERSION") {
            config.engine_version = version;
        }
        if let Some(binary) = vars.string("ENGINE_BINARY") {
            config.engine_binary = PathBuf::from(binary);
        }
        // An empty value disables the shared install cache
        if let Some(cache) = (vars.0)("ENGINE_CACHE_DIR") {
            config.engine_cache_dir = (!cache.is_empty()).then(|| PathBuf::from(cache));
        }
        if let Some(switcher) = vars.string("VERSION_SWITCHER") {
            config.version_switcher = switcher;
        }
        if let Some(prefix) = vars.string("VARIABLE_PREFIX") {
            config.variable_prefix = prefix;
        }
        if let Some(timeout) = vars.parse::<u64>("RUN_TIMEOUT")? {
            config.run_timeout = Duration::from_secs(timeout);
        }
        if let Some(policy) = vars.parse::<AckPolicy>("ACK_POLICY")? {
            config.ack_policy = policy;
        }
        if let Some(plan) = vars.parse::<bool>("PLAN_ENABLED")? {
            config.plan_enabled = plan;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.is_empty() {
            anyhow::bail!("worker_id cannot be empty");
        }

        for (name, url) in [
            ("control_plane_url", &self.control_plane_url),
            ("bundle_store_url", &self.bundle_store_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.queue_name.is_empty() {
            anyhow::bail!("queue_name cannot be empty");
        }

        if self.bundle_bucket.is_empty() {
            anyhow::bail!("bundle_bucket cannot be empty");
        }

        if !(1..=10).contains(&self.max_messages) {
            anyhow::bail!("max_messages must be between 1 and 10");
        }

        if self.wait_time.as_secs() > 20 {
            anyhow::bail!("wait_time cannot exceed 20 seconds");
        }

        if self.work_dir.as_os_str().is_empty() || self.work_dir.parent().is_none() {
            anyhow::bail!("work_dir must be a non-root directory");
        }

        if self.engine_version.is_empty() {
            anyhow::bail!("engine_version cannot be empty");
        }

        if self.run_timeout.as_secs() == 0 {
            anyhow::bail!("run_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            "http://localhost:8080".to_string(),
        )
    }
}

/// Errors raised while reading the configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Non-empty value of a variable
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|s| !s.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.string(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(name)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }
}
