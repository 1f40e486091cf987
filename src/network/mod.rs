//! Access to the college site: the schedule listing page and the files it links to.

pub mod cache;
pub mod http;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

pub use cache::ResponseCache;
pub use http::HttpScheduleApi;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to read response body: {0}")]
    Io(#[from] std::io::Error),

    #[error("no schedule links found")]
    NoLinks,
}

/// Source of schedule data. Implementations are shared with download workers.
pub trait ScheduleApi: Send + Sync {
    /// Fetch a schedule file by absolute URL.
    fn get_schedule_file(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch the page listing the current schedule files.
    fn get_main_page(&self) -> Result<SchedulePage, FetchError>;
}

/// A fetched HTML or XML document.
#[derive(Debug, Clone)]
pub struct SchedulePage {
    pub base_uri: String,
    pub content_type: String,
    pub body: String,
}

fn href_pattern() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("href pattern is valid")
    })
}

impl SchedulePage {
    pub fn new(base_uri: impl Into<String>, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn is_xml(&self) -> bool {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        mime == "application/xml" || mime == "text/xml"
    }

    /// Every `href` on the page resolved against the base URI, in page
    /// order without duplicates. Unresolvable links are skipped.
    pub fn links(&self) -> Vec<String> {
        let base = Url::parse(&self.base_uri).ok();
        let mut links: Vec<String> = Vec::new();

        for capture in href_pattern().captures_iter(&self.body) {
            let raw = capture[1].trim().replace("&amp;", "&");
            let resolved = match &base {
                Some(base) => base.join(&raw).ok(),
                None => Url::parse(&raw).ok(),
            };
            let Some(url) = resolved else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }
            let url = url.to_string();
            if !links.contains(&url) {
                links.push(url);
            }
        }

        links
    }

    /// Links whose path ends in one of `extensions` (case-insensitive).
    pub fn links_with_extensions(&self, extensions: &[String]) -> Vec<String> {
        self.links()
            .into_iter()
            .filter(|link| has_extension(link, extensions))
            .collect()
    }
}

fn has_extension(link: &str, extensions: &[String]) -> bool {
    let path = Url::parse(link)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| link.to_string());
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="/files/schedule_group1.xlsx">Group 1</a>
          <a HREF='files/week.CSV?v=2'>Week</a>
          <a href="https://cdn.example.org/other.pdf">Other</a>
          <a href="/files/schedule_group1.xlsx">Duplicate</a>
          <a href="mailto:office@example.org">Mail</a>
        </body></html>
    "#;

    fn page() -> SchedulePage {
        SchedulePage::new("https://example.org/students/schedule/", "text/html; charset=utf-8", PAGE)
    }

    #[test]
    fn test_links_resolved_and_deduplicated() {
        let links = page().links();
        assert_eq!(
            links,
            vec![
                "https://example.org/files/schedule_group1.xlsx",
                "https://example.org/students/schedule/files/week.CSV?v=2",
                "https://cdn.example.org/other.pdf",
            ]
        );
    }

    #[test]
    fn test_links_filtered_by_extension() {
        let extensions = vec!["xlsx".to_string(), "csv".to_string()];
        let links = page().links_with_extensions(&extensions);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| !l.ends_with(".pdf")));
    }

    #[test]
    fn test_content_type_detection() {
        assert!(!page().is_xml());
        assert!(SchedulePage::new("https://example.org", "text/xml; charset=utf-8", "").is_xml());
        assert!(SchedulePage::new("https://example.org", "application/xml", "").is_xml());
    }
}
