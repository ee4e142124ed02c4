//! Three-part insight shown to the operator next to the live slide.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::gemini::GeminiClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub context: String,
    pub theology: String,
    pub application: String,
}

impl Insight {
    /// Shown when no API key is available.
    pub fn offline() -> Self {
        Self {
            context: "Offline Mode.".to_string(),
            theology: "AI Insights unavailable.".to_string(),
            application: "Please check internet/API Key.".to_string(),
        }
    }

    /// Shown when the request failed.
    pub fn unavailable() -> Self {
        Self {
            context: "Could not load context.".to_string(),
            theology: "Could not load theology.".to_string(),
            application: "Could not load application.".to_string(),
        }
    }

    pub fn sections(&self) -> [(&'static str, &str); 3] {
        [
            ("Context", &self.context),
            ("Theology", &self.theology),
            ("Application", &self.application),
        ]
    }
}

fn insight_schema() -> Value {
    let section = |description: &str| json!({ "type": "STRING", "description": description });
    json!({
        "type": "OBJECT",
        "properties": {
            "context": section("Historical or situational context (max 30 words)"),
            "theology": section("Theological significance (max 30 words)"),
            "application": section("Practical application (max 30 words)")
        },
        "required": ["context", "theology", "application"]
    })
}

fn insight_prompt(reference: &str, body: &str) -> String {
    format!(
        "Analyze this scripture verse: \"{reference} - {body}\".\n\
         Provide brief, presentable insights for a slide show.\n\
         \n\
         For the context: if the verse is from the Bible, give historical or biblical context; \
         if it is from the Book of Mormon, Doctrine and Covenants or Pearl of Great Price, \
         give the restoration context.\n\
         \n\
         Keep each section under 30 words and use simple, reverent language."
    )
}

/// Blocking. Never fails: problems turn into placeholder text.
pub fn generate(client: Option<&GeminiClient>, reference: &str, body: &str) -> Insight {
    let Some(client) = client else {
        return Insight::offline();
    };
    match client.generate_json::<Insight>(&insight_prompt(reference, body), insight_schema()) {
        Ok(insight) => insight,
        Err(e) => {
            warn!(reference, error = %e, "Could not load insights");
            Insight::unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_without_client() {
        assert_eq!(generate(None, "John 3:16", "For God so loved"), Insight::offline());
    }

    #[test]
    fn test_prompt_mentions_verse() {
        let prompt = insight_prompt("Alma 32:21", "faith is not to have a perfect knowledge");
        assert!(prompt.contains("\"Alma 32:21 - faith is not"));
    }

    #[test]
    fn test_sections_order() {
        let titles: Vec<_> = Insight::unavailable()
            .sections()
            .iter()
            .map(|(title, _)| *title)
            .collect();
        assert_eq!(titles, ["Context", "Theology", "Application"]);
    }
}
