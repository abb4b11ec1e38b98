//! Web search and browser opening
//!
//! Searches the DuckDuckGo HTML endpoint when built with the `net` feature.
//! Opening links always goes through the desktop shell.

use super::{Shell, SystemShell, ToolError, WebHit, WebSearch};
use crate::config::WebConfig;
use regex::Regex;
use std::sync::Arc;
use url::Url;

const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com/";

pub struct DuckDuckGo {
    #[cfg_attr(not(feature = "net"), allow(dead_code))]
    config: WebConfig,
    shell: Arc<dyn Shell>,
    anchor: Regex,
    href: Regex,
    tag: Regex,
}

impl DuckDuckGo {
    pub fn new(config: WebConfig) -> Self {
        Self {
            config,
            shell: Arc::new(SystemShell),
            anchor: Regex::new(r#"(?s)<a\s([^>]*)>(.*?)</a>"#).expect("static anchor pattern"),
            href: Regex::new(r#"href="([^"]*)""#).expect("static href pattern"),
            tag: Regex::new(r"<[^>]+>").expect("static tag pattern"),
        }
    }

    pub fn with_shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    /// Extract `result__a` links from a results page
    pub fn parse_results(&self, html: &str, max_results: usize) -> Vec<WebHit> {
        let mut hits = Vec::new();

        for caps in self.anchor.captures_iter(html) {
            let attrs = &caps[1];
            if !attrs.contains("result__a") {
                continue;
            }
            let Some(href) = self.href.captures(attrs).map(|c| unescape(&c[1])) else {
                continue;
            };

            let title = unescape(self.tag.replace_all(&caps[2], "").trim());
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            let url = redirect_target(&href);
            if title.is_empty() || url.is_empty() {
                continue;
            }

            hits.push(WebHit { title, url });
            if hits.len() >= max_results {
                break;
            }
        }
        hits
    }

    #[cfg(feature = "net")]
    fn fetch(&self, query: &str) -> Result<String, ToolError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| ToolError::Network(e.to_string()))?;

        client
            .get(&self.config.search_url)
            .query(&[("q", query), ("ia", "web")])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| ToolError::Network(e.to_string()))
    }

    #[cfg(not(feature = "net"))]
    fn fetch(&self, _query: &str) -> Result<String, ToolError> {
        Err(ToolError::Network(
            "веб-поиск недоступен в сборке без функции net".to_string(),
        ))
    }
}

impl WebSearch for DuckDuckGo {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebHit>, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let html = self.fetch(query)?;
        let hits = self.parse_results(&html, max_results);
        log::debug!("web: {} hit(s) for '{}'", hits.len(), query);
        Ok(hits)
    }

    fn open(&self, url: &str) -> Result<String, ToolError> {
        let normalized = normalize_url(url)
            .ok_or_else(|| ToolError::Network("пустой URL".to_string()))?;

        self.shell
            .open(&normalized)
            .map_err(|e| ToolError::Network(format!("{}: {}", normalized, e)))?;
        log::info!("web: opened {}", normalized);
        Ok(normalized)
    }
}

/// Add `https://` when the scheme is missing
pub fn normalize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.contains("://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url.trim_start_matches('/')))
    }
}

/// DuckDuckGo wraps results in `/l/?uddg=<encoded target>`
fn redirect_target(href: &str) -> String {
    let parsed = Url::parse(DUCKDUCKGO_BASE).and_then(|base| base.join(href));
    let Ok(parsed) = parsed else {
        return href.to_string();
    };

    let is_redirect = parsed
        .host_str()
        .map_or(false, |host| host.ends_with("duckduckgo.com"))
        && parsed.path().starts_with("/l/");
    if is_redirect {
        if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
            return target.into_owned();
        }
    }
    href.to_string()
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::RecordingShell;

    const PAGE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F&amp;rut=abc">The Rust <b>Programming</b> Language</a>
          <a class="result__snippet" href="https://ignored.example">snippet</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://www.rust-lang.org/">Rust &amp; Cargo</a>
        </div>
    "#;

    #[test]
    fn test_parse_results() {
        let web = DuckDuckGo::new(WebConfig::default());
        let hits = web.parse_results(PAGE, 5);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "The Rust Programming Language");
        assert_eq!(hits[0].url, "https://doc.rust-lang.org/book/");
        assert_eq!(hits[1].title, "Rust & Cargo");
        assert_eq!(hits[1].url, "https://www.rust-lang.org/");

        assert_eq!(web.parse_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_open_adds_scheme() {
        let shell = Arc::new(RecordingShell::default());
        let web = DuckDuckGo::new(WebConfig::default()).with_shell(shell.clone());

        assert_eq!(web.open("rust-lang.org").unwrap(), "https://rust-lang.org");
        assert_eq!(web.open("http://a.b").unwrap(), "http://a.b");
        assert!(web.open("  ").is_err());
        assert_eq!(shell.opened.lock().len(), 2);
    }

    #[test]
    fn test_redirect_target() {
        assert_eq!(redirect_target("/l/?uddg=%D0%BF%D1%80%D0%B8%20x"), "при x");
        assert_eq!(
            redirect_target("https://duckduckgo.com/l/?kh=-1&uddg=https%3A%2F%2Fa.b%2Fc%3Fd%3D1"),
            "https://a.b/c?d=1"
        );
        assert_eq!(redirect_target("https://www.rust-lang.org/"), "https://www.rust-lang.org/");
        assert_eq!(redirect_target("/l/?rut=abc"), "/l/?rut=abc");
    }
}
