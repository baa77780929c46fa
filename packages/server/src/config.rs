use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub jobs: JobSettings,
    pub metrics_capacity: usize,
}

/// Background job settings for research processing
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Attempts per research job, including the first one
    pub max_attempts: i32,
    /// Base delay of the exponential retry backoff
    pub backoff_base: Duration,
    /// Jobs claimed and run concurrently per poll
    pub batch_size: i64,
    pub poll_interval: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(2000),
            batch_size: 5,
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = JobSettings::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 3001)?,
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            news_api_key: non_empty_var("NEWS_API_KEY"),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            jobs: JobSettings {
                max_attempts: parse_or("JOB_MAX_ATTEMPTS", defaults.max_attempts)?,
                backoff_base: Duration::from_millis(parse_or(
                    "JOB_BACKOFF_BASE_MS",
                    defaults.backoff_base.as_millis() as u64,
                )?),
                batch_size: parse_or("JOB_BATCH_SIZE", defaults.batch_size)?,
                poll_interval: Duration::from_millis(parse_or(
                    "JOB_POLL_INTERVAL_MS",
                    defaults.poll_interval.as_millis() as u64,
                )?),
            },
            metrics_capacity: parse_or("METRICS_CAPACITY", 1000)?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_settings_defaults() {
        let settings = JobSettings::default();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.backoff_base, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(
            parse_list("http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
