use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Maximum characters of extracted text kept on an active resource.
pub const CONTENT_CAP_CHARS: usize = 10_000;
/// Characters shown by [`Resource::preview`].
pub const PREVIEW_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LinkCategory {
    #[default]
    General,
    Research,
    Article,
    Reference,
    Other,
}

impl LinkCategory {
    pub const ALL: [LinkCategory; 5] = [
        LinkCategory::General,
        LinkCategory::Research,
        LinkCategory::Article,
        LinkCategory::Reference,
        LinkCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Research => "Research",
            Self::Article => "Article",
            Self::Reference => "Reference",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown category {s:?} (expected one of General, Research, Article, Reference, Other)"
                ))
            })
    }
}

/// A registered link. Entries are never edited; duplicates are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedLink {
    pub title: String,
    pub url: String,
    pub category: LinkCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Link { url: String, category: LinkCategory },
}

/// The document or link currently grounding the assistant.
///
/// Built once from extracted text and replaced wholesale, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
    /// At most [`CONTENT_CAP_CHARS`] characters.
    pub content: String,
    /// Character count of the text before truncation.
    pub content_length: usize,
}

impl Resource {
    pub fn document(name: impl Into<String>, text: &str) -> Self {
        Self::new(name.into(), ResourceKind::Document, text)
    }

    pub fn link(link: &SavedLink, text: &str) -> Self {
        Self::new(
            link.title.clone(),
            ResourceKind::Link {
                url: link.url.clone(),
                category: link.category,
            },
            text,
        )
    }

    fn new(name: String, kind: ResourceKind, text: &str) -> Self {
        let (content, clipped) = truncate_chars(text, CONTENT_CAP_CHARS);
        let content_length = if clipped {
            text.chars().count()
        } else {
            content.chars().count()
        };
        Self {
            name,
            kind,
            content,
            content_length,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self.kind, ResourceKind::Document)
    }

    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            ResourceKind::Link { url, .. } => Some(url),
            ResourceKind::Document => None,
        }
    }

    /// Characters currently held (after truncation).
    pub fn chars_available(&self) -> usize {
        self.content.chars().count()
    }

    /// The text injected into the model context, if any.
    ///
    /// A link with no extracted content still tells the model what it is.
    pub fn context_text(&self) -> Option<String> {
        if !self.content.trim().is_empty() {
            return Some(self.content.clone());
        }
        match &self.kind {
            ResourceKind::Link { url, .. } => Some(link_descriptor(&self.name, url)),
            ResourceKind::Document => None,
        }
    }

    pub fn preview(&self) -> String {
        let (head, clipped) = truncate_chars(&self.content, PREVIEW_CHARS);
        if clipped {
            format!("{head}...")
        } else {
            head
        }
    }
}

pub fn link_descriptor(title: &str, url: &str) -> String {
    format!("Link: {title}\nURL: {url}")
}

/// Keep at most `max_chars` characters. Returns the kept prefix and whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => (s[..byte].to_string(), true),
        None => (s.to_string(), false),
    }
}
