use std::fmt;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::model::ModelBundle;
use crate::text::TextNormalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Fixed class table: 0 → Negative, 1 → Neutral, 2 → Positive.
    pub fn from_class(class: i64) -> Result<Self> {
        match class {
            0 => Ok(Sentiment::Negative),
            1 => Ok(Sentiment::Neutral),
            2 => Ok(Sentiment::Positive),
            other => Err(AppError::InternalConsistency(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub title: String,
    pub text: String,
    pub label: Sentiment,
}

/// Immutable inference context: linguistic resources plus the model bundle.
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug)]
pub struct InferenceService {
    normalizer: TextNormalizer,
    bundle: ModelBundle,
}

impl InferenceService {
    pub fn new(normalizer: TextNormalizer, bundle: ModelBundle) -> Self {
        InferenceService { normalizer, bundle }
    }

    pub fn classify(&self, title: &str, text: &str) -> Result<Prediction> {
        if title.trim().is_empty() && text.trim().is_empty() {
            return Err(AppError::Validation(
                "Please provide review_title or review_text.".into(),
            ));
        }

        let clean_title = self.normalizer.normalize(title);
        let clean_text = self.normalizer.normalize(text);

        let x_title = self.bundle.title_vectorizer.transform(&clean_title);
        let x_text = self.bundle.text_vectorizer.transform(&clean_text);
        let x = x_title.hstack(&x_text);

        let class = self.bundle.classifier.predict(&x);
        let label = Sentiment::from_class(class)?;

        Ok(Prediction {
            title: title.to_string(),
            text: text.to_string(),
            label,
        })
    }
}
