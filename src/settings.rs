use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub resources: ResourceSettings,
    pub scrape: ScrapeSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
    pub body_limit_kb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub fallback_dir: PathBuf,
    pub classifier_file: String,
    pub title_vectorizer_file: String,
    pub text_vectorizer_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub out_dir: PathBuf,
}

impl Settings {
    /// Defaults, then `reviews.toml` if present, then `REVIEWS_*` env vars
    /// (`REVIEWS_SERVER__BIND=127.0.0.1:8080`).
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(File::with_name("reviews").required(false))
            .add_source(Environment::with_prefix("REVIEWS").separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let b = Config::builder()
            .set_default("server.bind", "0.0.0.0:5000")?
            .set_default("server.body_limit_kb", 64)?
            .set_default("model.dir", "saved_models")?
            .set_default("model.fallback_dir", "/opt/review_sentiment/saved_models")?
            .set_default("model.classifier_file", "classifier.json")?
            .set_default("model.title_vectorizer_file", "tfidf_title.json")?
            .set_default("model.text_vectorizer_file", "tfidf_text.json")?
            .set_default("resources.dir", "resources")?
            .set_default("scrape.user_agent", DEFAULT_USER_AGENT)?
            .set_default("scrape.timeout_secs", 15)?
            .set_default("scrape.max_retries", 2)?
            .set_default("scrape.backoff_ms", 2000)?
            .set_default("scrape.out_dir", "review_data")?;
        Ok(b)
    }
}
