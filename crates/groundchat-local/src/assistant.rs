//! One chat session: registry, log, gate and the extract-then-complete flow.

use groundchat_core::context::{ERROR_PREFIX, SUMMARIZE_DOCUMENT_PROMPT, SUMMARIZE_WEBPAGE_PROMPT};
use groundchat_core::{
    AccessGate, ChatSession, ChatTurn, Completer, ContextAssembler, Error, LinkCategory,
    PageRenderer, Resource, ResourceRegistry, Result, Role, SavedLink,
};
use std::time::Instant;

use crate::config::Settings;
use crate::pdf::PdfTextExtractor;
use crate::web::{FetchMode, Tier, WebTextExtractor};

/// What a document upload or link selection left behind.
#[derive(Debug, Clone)]
pub struct Activation {
    pub resource: Resource,
    /// Set when the link text could not be extracted; the resource then carries only its descriptor.
    pub extraction_error: Option<Error>,
    pub tier: Option<Tier>,
    pub summary: Option<ChatTurn>,
}

pub struct Assistant<C, R> {
    registry: ResourceRegistry,
    session: ChatSession,
    gate: Option<AccessGate>,
    pdf: PdfTextExtractor,
    web: WebTextExtractor<R>,
    completer: C,
    assembler: ContextAssembler,
    auto_summarize: bool,
}

impl<C: Completer, R: PageRenderer> Assistant<C, R> {
    pub fn new(completer: C, web: WebTextExtractor<R>) -> Self {
        Self {
            registry: ResourceRegistry::new(),
            session: ChatSession::new(),
            gate: None,
            pdf: PdfTextExtractor::new(),
            web,
            completer,
            assembler: ContextAssembler::new(),
            auto_summarize: true,
        }
    }

    pub fn from_settings(completer: C, web: WebTextExtractor<R>, s: &Settings) -> Self {
        let session = match s.max_turns {
            Some(n) => ChatSession::with_max_turns(n),
            None => ChatSession::new(),
        };
        Self {
            session,
            auto_summarize: s.auto_summarize,
            ..Self::new(completer, web)
        }
    }

    pub fn with_gate(mut self, gate: AccessGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn auto_summarize(mut self, on: bool) -> Self {
        self.auto_summarize = on;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn gate(&self) -> Option<&AccessGate> {
        self.gate.as_ref()
    }

    fn check_access(&self, now: Instant) -> Result<()> {
        match &self.gate {
            Some(g) => g.check_at(now),
            None => Ok(()),
        }
    }

    /// Extract a PDF and make it the active resource.
    ///
    /// A stream that is not a parseable PDF leaves the active resource untouched.
    pub async fn upload_document(&mut self, name: &str, bytes: &[u8]) -> Result<Activation> {
        self.check_access(Instant::now())?;
        let text = self.pdf.extract(bytes)?;
        let resource = self
            .registry
            .set_active(Resource::document(name.trim(), &text))
            .clone();
        tracing::info!(
            name = %resource.name,
            chars = resource.content_length,
            "document activated"
        );
        let summary = self.maybe_summarize(SUMMARIZE_DOCUMENT_PROMPT).await;
        Ok(Activation {
            resource,
            extraction_error: None,
            tier: None,
            summary,
        })
    }

    pub fn add_link(&mut self, title: &str, url: &str, category: LinkCategory) -> Result<&SavedLink> {
        self.check_access(Instant::now())?;
        self.registry.add_link(title, url, category)
    }

    /// Removing a link never clears the active resource, even one built from it.
    pub fn remove_link(&mut self, index: usize) -> Result<SavedLink> {
        self.check_access(Instant::now())?;
        self.registry.remove_link(index)
    }

    /// Fetch a saved link's text and make it the active resource.
    ///
    /// Only an unknown index is an error; a failed extraction still activates
    /// the link with descriptor-only context.
    pub async fn select_link(&mut self, index: usize, mode: FetchMode) -> Result<Activation> {
        self.check_access(Instant::now())?;
        let link = self.registry.link(index)?.clone();
        let (text, tier, extraction_error) = match self.web.extract_with_mode(&link.url, mode).await
        {
            Ok(w) => (w.text, Some(w.tier), None),
            Err(e) => {
                tracing::warn!(url = %link.url, error = %e, "link text unavailable; using descriptor");
                (String::new(), None, Some(e))
            }
        };
        let resource = self
            .registry
            .set_active(Resource::link(&link, &text))
            .clone();
        tracing::info!(
            name = %resource.name,
            chars = resource.content_length,
            tier = ?tier,
            "link activated"
        );
        let summary = self.maybe_summarize(SUMMARIZE_WEBPAGE_PROMPT).await;
        Ok(Activation {
            resource,
            extraction_error,
            tier,
            summary,
        })
    }

    pub async fn ask(&mut self, prompt: &str) -> Result<&ChatTurn> {
        self.ask_at(prompt, Instant::now()).await
    }

    /// Record the prompt, call the model, record the reply (or the failure) as one more turn.
    ///
    /// An expired session is rejected before anything is recorded or sent.
    pub async fn ask_at(&mut self, prompt: &str, now: Instant) -> Result<&ChatTurn> {
        self.check_access(now)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::Validation("question is empty".to_string()));
        }
        self.session.append(Role::User, prompt);
        Ok(self.complete_turn(prompt).await)
    }

    async fn maybe_summarize(&mut self, prompt: &str) -> Option<ChatTurn> {
        if !self.auto_summarize {
            return None;
        }
        Some(self.complete_turn(prompt).await.clone())
    }

    async fn complete_turn(&mut self, prompt: &str) -> &ChatTurn {
        let context = self.registry.active().and_then(Resource::context_text);
        let req = self.assembler.build(
            prompt,
            context.as_deref(),
            self.session.tail(self.assembler.window()),
        );
        match self.completer.complete(&req).await {
            Ok(reply) => self.session.append(Role::Assistant, reply),
            Err(e) => {
                tracing::warn!(error = %e, "model call failed");
                self.session.append(Role::Error, format!("{ERROR_PREFIX}{e}"))
            }
        }
    }
}
