use crate::provider::gemini::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::provider::GenerationOptions;
use crate::reaper::ReaperConfig;
use crate::store::ExpiryPolicy;
use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a knowledgeable and friendly fitness assistant. \
Provide helpful, encouraging answers about fitness, workouts, health, diet and sleep. \
Keep responses conversational, practical, safe and motivational, and answer in medium to long length, \
explaining each point in detail. Only give fitness related information. \
If the user asks about something else, gently redirect them with a short answer and invite them \
to ask anything about gym training (biceps, triceps, chest, back, shoulders, legs, abs and core, \
full-body movements, cardio and mobility), diet, sleep hours, discipline and their health journey.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn exposes_error_details(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("unknown environment '{other}' (expected 'development' or 'production')"),
        }
    }
}

impl FromStr for ExpiryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-activity" | "last_activity" => Ok(Self::LastActivity),
            "created" | "creation" => Ok(Self::Created),
            other => bail!("unknown session expiry '{other}' (expected 'last-activity' or 'created')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub gemini: GeminiConfig,
    pub provider_timeout: Duration,
    pub reaper: ReaperConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fn parse<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match value {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("{e}"))
                    .with_context(|| format!("invalid value for {key}: '{v}'")),
                None => Ok(default),
            }
        }

        let provider_timeout =
            Duration::from_secs(parse("PROVIDER_TIMEOUT_SECS", get("PROVIDER_TIMEOUT_SECS"), 30u64)?);
        let generation = GenerationOptions {
            max_output_tokens: parse(
                "GEMINI_MAX_OUTPUT_TOKENS",
                get("GEMINI_MAX_OUTPUT_TOKENS"),
                1024u32,
            )?,
            temperature: parse("GEMINI_TEMPERATURE", get("GEMINI_TEMPERATURE"), 0.7f32)?,
        };

        let ttl = Duration::from_secs(parse("SESSION_TTL_SECS", get("SESSION_TTL_SECS"), 3600u64)?);
        let interval = Duration::from_secs(parse(
            "REAPER_INTERVAL_SECS",
            get("REAPER_INTERVAL_SECS"),
            3600u64,
        )?);
        if provider_timeout.is_zero() || ttl.is_zero() || interval.is_zero() {
            bail!("PROVIDER_TIMEOUT_SECS, SESSION_TTL_SECS and REAPER_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse("PORT", get("PORT"), 5000u16)?,
            environment: parse("APP_ENV", get("APP_ENV"), Environment::Production)?,
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
                system_instruction: get("GEMINI_SYSTEM_PROMPT")
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
                generation,
                timeout: provider_timeout,
            },
            provider_timeout,
            reaper: ReaperConfig {
                interval,
                ttl,
                policy: parse("SESSION_EXPIRY", get("SESSION_EXPIRY"), ExpiryPolicy::default())?,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
