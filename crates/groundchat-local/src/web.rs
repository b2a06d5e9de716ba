//! URL → plain text, static parse first, headless browser second.

use groundchat_core::{Error, PageRenderer, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::Settings;

/// Elements dropped from `<body>` before text extraction.
const NON_CONTENT_TAGS: [&str; 4] = ["script", "style", "img", "input"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Static tier, falling back to the browser tier when it yields nothing.
    #[default]
    Auto,
    Static,
    Dynamic,
}

impl FromStr for FetchMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "static" => Ok(Self::Static),
            "dynamic" | "browser" => Ok(Self::Dynamic),
            other => Err(Error::NotSupported(format!(
                "unknown fetch mode {other:?} (expected auto, static or dynamic)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Static,
    Dynamic,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        })
    }
}

#[derive(Debug, Clone)]
pub struct WebText {
    pub text: String,
    pub tier: Tier,
    /// HTTP status of the static attempt, when one completed.
    pub status: Option<u16>,
}

/// Text of `<body>` with non-content elements removed.
///
/// Each text node is trimmed; non-empty ones are joined with `\n`.
pub fn html_body_text(html: &str) -> String {
    let doc = html_scraper::Html::parse_document(html);
    let root = match html_scraper::Selector::parse("body") {
        Ok(sel) => doc.select(&sel).next(),
        Err(_) => None,
    };
    let root = match root {
        Some(body) => *body,
        None => doc.tree.root(),
    };

    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let html_scraper::Node::Text(t) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NON_CONTENT_TAGS.contains(&e.name()))
        });
        if skipped {
            continue;
        }
        let s = t.trim();
        if !s.is_empty() {
            parts.push(s);
        }
    }
    parts.join("\n")
}

pub struct WebTextExtractor<R> {
    client: reqwest::Client,
    renderer: R,
    fetch_timeout: Duration,
    render_timeout: Duration,
    max_bytes: u64,
}

impl<R: PageRenderer> WebTextExtractor<R> {
    pub fn new(client: reqwest::Client, renderer: R) -> Self {
        let d = Settings::default();
        Self {
            client,
            renderer,
            fetch_timeout: d.fetch_timeout,
            render_timeout: d.render_timeout,
            max_bytes: d.fetch_max_bytes,
        }
    }

    pub fn from_settings(client: reqwest::Client, renderer: R, s: &Settings) -> Self {
        Self {
            fetch_timeout: s.fetch_timeout,
            render_timeout: s.render_timeout,
            max_bytes: s.fetch_max_bytes,
            ..Self::new(client, renderer)
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Two-tier cascade; the text only.
    pub async fn extract(&self, url: &str) -> Result<String> {
        self.extract_with_mode(url, FetchMode::Auto)
            .await
            .map(|w| w.text)
    }

    pub async fn extract_with_mode(&self, url: &str, mode: FetchMode) -> Result<WebText> {
        match mode {
            FetchMode::Static => {
                let (status, text) = self.static_tier(url).await?;
                if text.is_empty() {
                    return Err(Error::NoVisibleText(url.to_string()));
                }
                Ok(WebText {
                    text,
                    tier: Tier::Static,
                    status: Some(status),
                })
            }
            FetchMode::Dynamic => self.dynamic_tier(url, None).await,
            FetchMode::Auto => {
                let status = match self.static_tier(url).await {
                    Ok((status, text)) if !text.is_empty() => {
                        return Ok(WebText {
                            text,
                            tier: Tier::Static,
                            status: Some(status),
                        });
                    }
                    Ok((status, _)) => {
                        tracing::info!(url, status, "static tier yielded no text; trying browser");
                        Some(status)
                    }
                    Err(e) => {
                        tracing::info!(url, error = %e, "static tier failed; trying browser");
                        None
                    }
                };
                self.dynamic_tier(url, status).await
            }
        }
    }

    /// GET with a bounded timeout; success is judged by text, not by HTTP status.
    async fn static_tier(&self, url: &str) -> Result<(u16, String)> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resp = self
            .client
            .get(parsed)
            .header(reqwest::header::USER_AGENT, crate::config::BROWSER_USER_AGENT)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status().as_u16();
        let encoding = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of)
            .unwrap_or(encoding_rs::UTF_8);

        let max_bytes = self.max_bytes as usize;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                tracing::warn!(url, max_bytes, "static body truncated");
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        let (html, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            tracing::debug!(url, encoding = encoding.name(), "static body had undecodable bytes");
        }
        let text = html_body_text(&html);
        tracing::debug!(url, status, chars = text.chars().count(), "static tier done");
        Ok((status, text))
    }

    async fn dynamic_tier(&self, url: &str, status: Option<u16>) -> Result<WebText> {
        let text = self.renderer.render_text(url, self.render_timeout).await?;
        Ok(WebText {
            text,
            tier: Tier::Dynamic,
            status,
        })
    }
}

/// The encoding named by a Content-Type `charset` parameter, if it is one we know.
fn charset_of(content_type: &str) -> Option<&'static encoding_rs::Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        if !k.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        encoding_rs::Encoding::for_label(v.trim().trim_matches('"').as_bytes())
    })
}
