// dashboardtool/src/config/mod.rs
use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::utils::retry::RetryPolicy;

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonTimingConfig {
    pub settle_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub poll_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonS3StorageConfig {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub force_path_style: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub aws_profile: Option<String>,
    pub aws_region: Option<String>,
    pub timing: Option<JsonTimingConfig>,
    pub s3_storage: Option<JsonS3StorageConfig>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
}

impl AwsConfig {
    /// Resolves credentials and region through the standard AWS chain, pinned
    /// to the configured profile/region when present.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        loader.load().await
    }
}

/// Delays used around asynchronous backend operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Pause between deleting a resource and recreating it.
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl Timing {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.poll_attempts,
            interval: self.poll_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStoreConfig {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub aws: AwsConfig,
    pub timing: Timing,
    pub object_store: Option<ObjectStoreConfig>,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;
        Self::from_raw(raw_json_config)
    }

    /// Loads the explicit config file, else `./config.json` when it exists, else defaults.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        match explicit_path {
            Some(path) => Self::load_from_json(path),
            None if Path::new("config.json").exists() => {
                Self::load_from_json(Path::new("config.json"))
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::from_raw(RawJsonConfig::default())
            }
        }
    }

    pub fn from_raw(raw: RawJsonConfig) -> Result<Self> {
        let timing_raw = raw.timing.unwrap_or_default();
        let defaults = Timing::default();
        let timing = Timing {
            settle_delay: timing_raw
                .settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            poll_interval: timing_raw
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            poll_attempts: timing_raw.poll_attempts.unwrap_or(defaults.poll_attempts),
        };
        if timing.poll_attempts == 0 {
            return Err(anyhow::anyhow!(
                "timing.poll_attempts must be at least 1 in config.json."
            ));
        }

        let object_store = raw.s3_storage.map(|s3_raw| ObjectStoreConfig {
            endpoint_url: s3_raw.endpoint_url.filter(|s| !s.is_empty()),
            region: s3_raw.region.filter(|s| !s.is_empty()),
            force_path_style: s3_raw.force_path_style.unwrap_or(false),
        });

        Ok(AppConfig {
            aws: AwsConfig {
                profile: raw.aws_profile.filter(|s| !s.is_empty()),
                region: raw.aws_region.filter(|s| !s.is_empty()),
            },
            timing,
            object_store,
        })
    }

    /// Command-line flags win over the config file.
    pub fn with_overrides(mut self, aws_profile: Option<String>, aws_region: Option<String>) -> Self {
        if aws_profile.is_some() {
            self.aws.profile = aws_profile;
        }
        if aws_region.is_some() {
            self.aws.region = aws_region;
        }
        self
    }
}
