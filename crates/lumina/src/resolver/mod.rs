//! Turns a free-text query into slide content.
//!
//! Lookup order: the bundled offline verses, then Gemini when an API key is
//! configured, then the public sources. An AI failure falls through to the
//! public sources; every other failure is reported to the caller.

pub mod library;
pub mod online;
pub mod reference;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::model::{Locator, SlideContent};
use crate::render::DEFAULT_LOADING_LABEL;
use online::PublicSources;
use reference::parse_query;

pub use reference::{Direction, step};

pub const DOWNLOADING_LABEL: &str = "DOWNLOADING LIBRARY...";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid format. Try '1 Nephi 3:7'")]
    InvalidFormat,

    #[error("{0}")]
    NotFound(String),

    #[error("Offline: verse not in local library")]
    Offline,

    #[error("{0}")]
    Upstream(String),
}

/// Shape Gemini is asked to answer a verse lookup with.
#[derive(Debug, Deserialize)]
struct AiVerse {
    reference: String,
    text: String,
    book: String,
    chapter: u32,
    verse: u32,
    version: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<AiVerse> for SlideContent {
    fn from(v: AiVerse) -> Self {
        SlideContent {
            reference: v.reference,
            body: v.text,
            source_label: v.version,
            locator: Locator {
                book: v.book,
                chapter: v.chapter,
                verse: v.verse,
            },
            tags: v.tags,
        }
    }
}

fn verse_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "reference": { "type": "STRING", "description": "e.g., 1 Nephi 3:7" },
            "text": { "type": "STRING", "description": "The verse text content" },
            "book": { "type": "STRING" },
            "chapter": { "type": "INTEGER" },
            "verse": { "type": "INTEGER" },
            "version": { "type": "STRING", "description": "e.g., KJV, Book of Mormon, D&C" },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "3-4 keywords describing the mood/theme"
            }
        },
        "required": ["reference", "text", "book", "chapter", "verse", "version"]
    })
}

fn verse_prompt(query: &str) -> String {
    format!(
        "Find the scripture verse described by this query: \"{query}\".\n\
         \n\
         Search scope: the Holy Bible (KJV), the Book of Mormon, the Doctrine and Covenants \
         and the Pearl of Great Price.\n\
         \n\
         If the query is a specific reference, retrieve that exact text. \
         If it is a topic or phrase, find the most relevant verse. \
         Identify the book, chapter and verse accurately.\n\
         \n\
         Return JSON only."
    )
}

pub struct Resolver {
    ai: Option<GeminiClient>,
    public: PublicSources,
}

impl Resolver {
    pub fn new(ai: Option<GeminiClient>) -> Self {
        Self {
            ai,
            public: PublicSources::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(GeminiClient::from_config(config))
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Blocking; call from a worker thread when a UI is running.
    pub fn resolve(&self, query: &str) -> Result<SlideContent, ResolveError> {
        let parsed = parse_query(query).ok_or(ResolveError::InvalidFormat)?;

        if let Some(slide) = library::lookup(&parsed) {
            debug!(reference = %slide.reference, "Resolved from offline library");
            return Ok(slide);
        }

        if let Some(ai) = &self.ai {
            match ai.generate_json::<AiVerse>(&verse_prompt(query), verse_schema()) {
                Ok(verse) => return Ok(verse.into()),
                Err(e) => warn!(error = %e, "AI lookup failed, falling back to public sources"),
            }
        }

        let volume = parsed
            .volume()
            .ok_or_else(|| ResolveError::NotFound(format!("Unknown book: {}", parsed.book)))?;
        self.public.fetch(&parsed, volume)
    }

    /// Label for the loading overlay while `query` resolves.
    pub fn loading_label(&self, query: &str) -> &'static str {
        if self.ai.is_some() {
            return DEFAULT_LOADING_LABEL;
        }
        let needs_download = parse_query(query)
            .filter(|p| library::lookup(p).is_none())
            .and_then(|p| p.volume())
            .is_some_and(|v| v.is_dataset() && !self.public.is_cached(v));
        if needs_download {
            DOWNLOADING_LABEL
        } else {
            DEFAULT_LOADING_LABEL
        }
    }
}
