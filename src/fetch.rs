use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::settings::ScrapeSettings;

/// Source of raw review pages, numbered from 1.
pub trait PageSource {
    async fn fetch_page(&self, page: u32) -> Result<String, AppError>;
}

/// Rewrite (or append) the `page` query parameter, keeping every other
/// parameter in place.
pub fn page_url(template: &Url, page: u32) -> Url {
    let mut pairs: Vec<(String, String)> = template
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == "page") {
        Some((_, v)) => *v = page.to_string(),
        None => pairs.push(("page".to_string(), page.to_string())),
    }

    let mut url = template.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

/// Sequential HTTP fetcher for a templated review URL.
pub struct HttpPages {
    client: Client,
    template: Url,
    max_retries: u32,
    backoff: Duration,
}

impl HttpPages {
    pub fn new(template: &str, settings: &ScrapeSettings) -> anyhow::Result<Self> {
        let template = Url::parse(template)?;
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(HttpPages {
            client,
            template,
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        })
    }

    async fn get_once(&self, url: &Url) -> Result<String, (Option<StatusCode>, String)> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| (e.status(), e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err((Some(status), format!("HTTP {}", status)));
        }
        resp.text().await.map_err(|e| (None, e.to_string()))
    }
}

impl PageSource for HttpPages {
    async fn fetch_page(&self, page: u32) -> Result<String, AppError> {
        let url = page_url(&self.template, page);
        debug!(page, %url, "Fetching");

        for attempt in 0..=self.max_retries {
            let start = Instant::now();
            match self.get_once(&url).await {
                Ok(body) => {
                    debug!(page, bytes = body.len(), ms = start.elapsed().as_millis() as u64, "Fetched");
                    return Ok(body);
                }
                Err((status, reason)) => {
                    if !should_retry(status) || attempt == self.max_retries {
                        return Err(AppError::UpstreamFetch { page, reason });
                    }
                    let backoff = backoff_for(self.backoff, attempt);
                    warn!(
                        "Page {} returned {} (attempt {}/{}), backing off {:.1}s",
                        page,
                        reason,
                        attempt + 1,
                        self.max_retries + 1,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(AppError::UpstreamFetch {
            page,
            reason: "retries exhausted".into(),
        })
    }
}

/// `base * 2^attempt`, saturating instead of overflowing on large retry counts.
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Rate limiting and server errors are worth another try; everything else is final.
fn should_retry(status: Option<StatusCode>) -> bool {
    matches!(status, Some(s) if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error())
}
