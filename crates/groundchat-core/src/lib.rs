use std::time::Duration;

pub mod context;
pub mod gate;
pub mod registry;
pub mod resource;
pub mod session;

pub use context::{ChatMessage, ContextAssembler, ModelRequest};
pub use gate::{AccessGate, UserTier};
pub use registry::ResourceRegistry;
pub use resource::{LinkCategory, Resource, ResourceKind, SavedLink};
pub use session::{ChatSession, ChatTurn, Role};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("no visible text found on the page: {0}")]
    NoVisibleText(String),
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Expired(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not supported: {0}")]
    NotSupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Renders a page in a real browser and returns the visible body text.
///
/// Implementations own the browser for the duration of one call and must
/// release it on every exit path.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn render_text(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// The hosted-model boundary: one request in, one reply out.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, req: &ModelRequest) -> Result<String>;
}
