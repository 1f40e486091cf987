//! Blocking HTTP implementation of `ScheduleApi`, with an optional offline cache.

use std::io::Read;
use std::time::Duration;

use super::{FetchError, ResponseCache, ScheduleApi, SchedulePage};
use crate::config::Config;

/// Upper bound on a downloaded body.
const MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// `ScheduleApi` backed by blocking HTTP requests through `ureq`.
pub struct HttpScheduleApi {
    agent: ureq::Agent,
    page_url: String,
    cache: Option<ResponseCache>,
}

impl HttpScheduleApi {
    pub fn new(page_url: impl Into<String>, timeout: Duration, cache: Option<ResponseCache>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("lessonbook/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            page_url: page_url.into(),
            cache,
        }
    }

    /// Build from config. `caching_enabled` is the user toggle from settings
    /// and wins over the config default.
    pub fn from_config(config: &Config, caching_enabled: bool) -> Self {
        let cache = (config.cache.enabled && caching_enabled)
            .then(|| ResponseCache::from_config(&config.cache));
        Self::new(
            config.network.schedule_page_url(),
            Duration::from_secs(config.network.timeout_secs),
            cache,
        )
    }

    /// GET `url`, returning the body and its content type. Falls back to the
    /// cached body when the request fails.
    fn fetch(&self, url: &str) -> Result<(Vec<u8>, String), FetchError> {
        match self.request(url) {
            Ok((body, content_type)) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(url, &body) {
                        tracing::warn!(url, error = %e, "Failed to cache response");
                    }
                }
                Ok((body, content_type))
            }
            Err(e) => match self.cache.as_ref().and_then(|cache| cache.get(url)) {
                Some(body) => {
                    tracing::warn!(url, error = %e, "Request failed, serving cached response");
                    Ok((body, String::new()))
                }
                None => Err(e),
            },
        }
    }

    fn request(&self, url: &str) -> Result<(Vec<u8>, String), FetchError> {
        tracing::debug!(url, "GET");
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })?;

        let content_type = response.header("Content-Type").unwrap_or_default().to_string();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)?;

        Ok((body, content_type))
    }
}

impl ScheduleApi for HttpScheduleApi {
    fn get_schedule_file(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch(url).map(|(body, _)| body)
    }

    fn get_main_page(&self) -> Result<SchedulePage, FetchError> {
        let (body, content_type) = self.fetch(&self.page_url)?;
        let content_type = if content_type.is_empty() {
            "text/html".to_string()
        } else {
            content_type
        };
        Ok(SchedulePage::new(
            self.page_url.clone(),
            content_type,
            String::from_utf8_lossy(&body).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unreachable_host_serves_cached_body() {
        let dir = tempdir().unwrap();
        let url = "http://127.0.0.1:9/files/week.csv";
        let cache = ResponseCache::new(dir.path(), 1024);
        cache.put(url, b"cached").unwrap();

        let api = HttpScheduleApi::new("http://127.0.0.1:9/", Duration::from_secs(1), Some(cache));
        assert_eq!(api.get_schedule_file(url).unwrap(), b"cached");
    }

    #[test]
    fn test_unreachable_host_without_cache_fails() {
        let api = HttpScheduleApi::new("http://127.0.0.1:9/", Duration::from_secs(1), None);
        let err = api.get_schedule_file("http://127.0.0.1:9/files/week.csv").unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[test]
    fn test_from_config_respects_caching_toggle() {
        let config = Config::default();
        assert!(HttpScheduleApi::from_config(&config, false).cache.is_none());
        assert!(HttpScheduleApi::from_config(&config, true).cache.is_some());
    }
}
