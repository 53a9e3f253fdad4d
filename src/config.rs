use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::{DailyLimits, InterestPolicy, MatchOptions};
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    pub database: DatabaseSettings,
    /// Optional; without it profile lookups go straight to the directory
    #[serde(default)]
    pub cache: Option<CacheSettings>,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub interests: InterestSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub profiles: String,
    pub users: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_match_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_match_limit")]
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_match_limit(),
            max_limit: default_max_match_limit(),
        }
    }
}

fn default_match_limit() -> usize { 50 }
fn default_max_match_limit() -> usize { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct InterestSettings {
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    #[serde(default = "default_message_max_chars")]
    pub message_max_chars: usize,
    #[serde(default)]
    pub daily_limits: DailyLimitSettings,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for InterestSettings {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            message_max_chars: default_message_max_chars(),
            daily_limits: DailyLimitSettings::default(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

fn default_expiry_days() -> i64 { 30 }
fn default_message_max_chars() -> usize { 500 }
fn default_purge_interval_secs() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct DailyLimitSettings {
    #[serde(default = "default_basic_limit")]
    pub basic: u32,
    #[serde(default = "default_premium_limit")]
    pub premium: u32,
    #[serde(default = "default_elite_limit")]
    pub elite: u32,
}

impl Default for DailyLimitSettings {
    fn default() -> Self {
        Self {
            basic: default_basic_limit(),
            premium: default_premium_limit(),
            elite: default_elite_limit(),
        }
    }
}

fn default_basic_limit() -> u32 { 10 }
fn default_premium_limit() -> u32 { 50 }
fn default_elite_limit() -> u32 { 100 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_age_weight")]
    pub age: f64,
    #[serde(default = "default_education_weight")]
    pub education: f64,
    #[serde(default = "default_occupation_weight")]
    pub occupation: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_family_weight")]
    pub family: f64,
    #[serde(default = "default_lifestyle_weight")]
    pub lifestyle: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            age: default_age_weight(),
            education: default_education_weight(),
            occupation: default_occupation_weight(),
            location: default_location_weight(),
            family: default_family_weight(),
            lifestyle: default_lifestyle_weight(),
        }
    }
}

fn default_age_weight() -> f64 { 0.20 }
fn default_education_weight() -> f64 { 0.15 }
fn default_occupation_weight() -> f64 { 0.15 }
fn default_location_weight() -> f64 { 0.10 }
fn default_family_weight() -> f64 { 0.20 }
fn default_lifestyle_weight() -> f64 { 0.20 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default, then config/local)
    /// 3. Environment variables (prefixed with MATRIMONY__)
    /// 4. `DATABASE_URL` and `JWT_SECRET`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MATRIMONY__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        let settings = apply_env_overrides(settings)?;
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.scoring.weights.to_weights().total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Message(format!(
                "scoring.weights must sum to 1.0, got {:.4}",
                total
            )));
        }
        if self.matching.default_limit == 0 || self.matching.max_limit == 0 {
            return Err(ConfigError::Message(
                "matching limits must be positive".to_string(),
            ));
        }
        if self.interests.expiry_days <= 0 {
            return Err(ConfigError::Message(
                "interests.expiry_days must be positive".to_string(),
            ));
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret is required".to_string()));
        }
        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            default_limit: self.matching.default_limit.min(self.matching.max_limit),
            max_limit: self.matching.max_limit,
        }
    }

    pub fn interest_policy(&self) -> InterestPolicy {
        let limits = &self.interests.daily_limits;
        InterestPolicy {
            expiry_days: self.interests.expiry_days,
            message_max_chars: self.interests.message_max_chars,
            daily_limits: DailyLimits {
                basic: limits.basic,
                premium: limits.premium,
                elite: limits.elite,
            },
        }
    }
}

impl WeightsConfig {
    pub fn to_weights(&self) -> ScoringWeights {
        ScoringWeights {
            age: self.age,
            education: self.education,
            occupation: self.occupation,
            location: self.location,
            family: self.family,
            lifestyle: self.lifestyle,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("MATRIMONY")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply the conventional unprefixed variables on top of the layered config
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(jwt_secret) = env::var("JWT_SECRET") {
        builder = builder.set_override("auth.jwt_secret", jwt_secret)?;
    }

    builder.build()
}
