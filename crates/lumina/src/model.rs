use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a verse lives: book, chapter and verse number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

/// The content currently shown on the projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    /// Display label, e.g. "1 Nephi 3:7". Also the history dedup key.
    pub reference: String,
    pub body: String,
    /// Edition or volume, e.g. "KJV" or "Book of Mormon".
    pub source_label: String,
    #[serde(default)]
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl SlideContent {
    /// Slide typed in by the operator rather than resolved from a query.
    pub fn manual(reference: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            body: body.into(),
            source_label: "Custom".to_string(),
            locator: Locator {
                book: "Manual".to_string(),
                chapter: 0,
                verse: 0,
            },
            tags: Vec::new(),
        }
    }

    /// Equivalent slides render identically, so switching between them must
    /// not replay the entrance animation. Only `reference` and `body` count.
    pub fn is_equivalent(&self, other: &SlideContent) -> bool {
        self.reference == other.reference && self.body == other.body
    }
}

/// Two optional slides are equivalent when both are empty or both hold
/// equivalent content.
pub fn slides_equivalent(a: Option<&SlideContent>, b: Option<&SlideContent>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_equivalent(b),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeMode {
    #[default]
    Classic,
    Modern,
    Nature,
    Dark,
    Light,
}

impl ThemeMode {
    pub fn all() -> &'static [ThemeMode] {
        &[
            ThemeMode::Classic,
            ThemeMode::Modern,
            ThemeMode::Nature,
            ThemeMode::Dark,
            ThemeMode::Light,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Modern => "modern",
            Self::Nature => "nature",
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|mode| mode.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn all() -> &'static [Alignment] {
        &[Alignment::Left, Alignment::Center, Alignment::Right]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontMode {
    /// Size derived from body length.
    #[default]
    Auto,
    /// Fixed size from `StyleSettings::font_size`.
    Manual,
}

impl FontMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

pub const DEFAULT_FONT_SIZE: f32 = 3.5;
pub const MIN_MANUAL_FONT_SIZE: f32 = 1.0;
pub const MAX_MANUAL_FONT_SIZE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub theme: ThemeMode,
    pub alignment: Alignment,
    pub font_mode: FontMode,
    /// Manual font size in rem.
    pub font_size: f32,
    pub show_reference: bool,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            alignment: Alignment::default(),
            font_mode: FontMode::default(),
            font_size: DEFAULT_FONT_SIZE,
            show_reference: true,
        }
    }
}

impl StyleSettings {
    /// Pure merge: every field set in `patch` wins, the rest is kept.
    pub fn merged(&self, patch: &StylePatch) -> StyleSettings {
        StyleSettings {
            theme: patch.theme.unwrap_or(self.theme),
            alignment: patch.alignment.unwrap_or(self.alignment),
            font_mode: patch.font_mode.unwrap_or(self.font_mode),
            font_size: patch.font_size.unwrap_or(self.font_size),
            show_reference: patch.show_reference.unwrap_or(self.show_reference),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StyleError {
    #[error(
        "Unknown style field: {0}. Valid fields: theme, alignment, font-mode, font-size, show-reference"
    )]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Expected key=value, got: {0}")]
    Malformed(String),
}

/// A partial style update. Only the enumerated fields can be changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePatch {
    pub theme: Option<ThemeMode>,
    pub alignment: Option<Alignment>,
    pub font_mode: Option<FontMode>,
    pub font_size: Option<f32>,
    pub show_reference: Option<bool>,
}

impl StylePatch {
    pub fn is_empty(&self) -> bool {
        *self == StylePatch::default()
    }

    pub fn theme(theme: ThemeMode) -> Self {
        Self {
            theme: Some(theme),
            ..Self::default()
        }
    }

    pub fn alignment(alignment: Alignment) -> Self {
        Self {
            alignment: Some(alignment),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StyleError> {
        let invalid = |field: &'static str| StyleError::InvalidValue {
            field,
            value: value.to_string(),
        };
        match key {
            "theme" => self.theme = Some(ThemeMode::from_name(value).ok_or_else(|| invalid("theme"))?),
            "alignment" | "align" => {
                self.alignment = Some(Alignment::from_name(value).ok_or_else(|| invalid("alignment"))?)
            }
            "font-mode" => {
                self.font_mode = Some(FontMode::from_name(value).ok_or_else(|| invalid("font-mode"))?)
            }
            "font-size" => {
                let size: f32 = value.parse().map_err(|_| invalid("font-size"))?;
                if !(MIN_MANUAL_FONT_SIZE..=MAX_MANUAL_FONT_SIZE).contains(&size) {
                    return Err(invalid("font-size"));
                }
                self.font_size = Some(size);
                // A fixed size only makes sense in manual mode.
                self.font_mode.get_or_insert(FontMode::Manual);
            }
            "show-reference" => {
                self.show_reference = Some(match value {
                    "true" | "yes" | "on" => true,
                    "false" | "no" | "off" => false,
                    _ => return Err(invalid("show-reference")),
                })
            }
            other => return Err(StyleError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    /// Parse `key=value` assignments into one patch.
    pub fn parse_assignments<S: AsRef<str>>(items: &[S]) -> Result<Self, StyleError> {
        let mut patch = StylePatch::default();
        for item in items {
            let item = item.as_ref();
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| StyleError::Malformed(item.to_string()))?;
            patch.set(key.trim(), value.trim())?;
        }
        Ok(patch)
    }
}

/// The unit of synchronization. Always replaced whole, never patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresentationState {
    pub slide: Option<Arc<SlideContent>>,
    #[serde(default)]
    pub style: Arc<StyleSettings>,
}

impl PresentationState {
    #[cfg(test)]
    pub fn new(slide: Option<SlideContent>, style: StyleSettings) -> Self {
        Self {
            slide: slide.map(Arc::new),
            style: Arc::new(style),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub slide: Arc<SlideContent>,
    /// Milliseconds since the Unix epoch.
    pub captured_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Operator,
    Display,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Display => "display",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(reference: &str, body: &str) -> SlideContent {
        SlideContent {
            reference: reference.to_string(),
            body: body.to_string(),
            source_label: "KJV".to_string(),
            locator: Locator::default(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_equivalence_ignores_tags_and_source() {
        let a = verse("John 3:16", "For God so loved the world");
        let mut b = a.clone();
        b.tags = vec!["love".to_string()];
        b.source_label = "NIV".to_string();
        assert!(a.is_equivalent(&b));

        let mut c = a.clone();
        c.body.push('.');
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_optional_slide_equivalence() {
        let a = verse("John 3:16", "For God");
        assert!(slides_equivalent(None, None));
        assert!(!slides_equivalent(Some(&a), None));
        assert!(!slides_equivalent(None, Some(&a)));
        assert!(slides_equivalent(Some(&a), Some(&a.clone())));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = StyleSettings::default();
        let merged = base.merged(&StylePatch::theme(ThemeMode::Nature));
        assert_eq!(merged.theme, ThemeMode::Nature);
        assert_eq!(merged.alignment, base.alignment);
        assert_eq!(merged.font_size, base.font_size);
        assert!(merged.show_reference);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let err = StylePatch::parse_assignments(&["background=red"]).unwrap_err();
        assert_eq!(err, StyleError::UnknownField("background".to_string()));

        let err = StylePatch::parse_assignments(&["theme"]).unwrap_err();
        assert!(matches!(err, StyleError::Malformed(_)));
    }

    #[test]
    fn test_patch_parses_known_fields() {
        let patch = StylePatch::parse_assignments(&[
            "theme=nature",
            "align=left",
            "show-reference=off",
        ])
        .unwrap();
        assert_eq!(patch.theme, Some(ThemeMode::Nature));
        assert_eq!(patch.alignment, Some(Alignment::Left));
        assert_eq!(patch.show_reference, Some(false));
        assert!(patch.font_mode.is_none());
    }

    #[test]
    fn test_font_size_implies_manual_mode() {
        let patch = StylePatch::parse_assignments(&["font-size=5"]).unwrap();
        assert_eq!(patch.font_mode, Some(FontMode::Manual));
        assert_eq!(patch.font_size, Some(5.0));

        assert!(StylePatch::parse_assignments(&["font-size=42"]).is_err());
    }

    #[test]
    fn test_state_deserializes_with_missing_style() {
        let state: PresentationState =
            serde_json::from_str(r#"{"slide":null}"#).unwrap();
        assert!(state.slide.is_none());
        assert_eq!(*state.style, StyleSettings::default());
    }
}
