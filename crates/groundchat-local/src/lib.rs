use groundchat_core::{Error, Result};
use std::time::Duration;

pub mod assistant;
pub mod config;
pub mod openai_compat;
pub mod pdf;
pub mod render_playwright;
pub mod web;

pub use assistant::{Activation, Assistant};
pub use config::Settings;
pub use openai_compat::OpenAiChatClient;
pub use pdf::PdfTextExtractor;
pub use render_playwright::PlaywrightRenderer;
pub use web::{html_body_text, FetchMode, Tier, WebText, WebTextExtractor};

/// Agent sent on model calls; page fetches override it per request.
pub const CLIENT_USER_AGENT: &str = concat!("groundchat/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for page fetches and model calls.
///
/// Per-request timeouts come from [`Settings`]; the connect timeout here only
/// guards DNS/TLS stalls.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(CLIENT_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}

/// The production wiring: env settings, Playwright fallback, OpenAI-compatible model.
pub fn assistant_from_settings(
    s: &Settings,
) -> Result<Assistant<OpenAiChatClient, PlaywrightRenderer>> {
    let client = build_http_client()?;
    let web =
        WebTextExtractor::from_settings(client.clone(), PlaywrightRenderer::from_settings(s), s);
    let completer = OpenAiChatClient::from_settings(client, s);
    Ok(Assistant::from_settings(completer, web, s))
}
