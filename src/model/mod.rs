pub mod classifier;
pub mod sparse;
pub mod vectorizer;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::inference::Sentiment;
use crate::settings::ModelSettings;
use classifier::Classifier;
use vectorizer::TfidfVectorizer;

/// Classifier plus its title and text vectorizers. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub classifier: Classifier,
    pub title_vectorizer: TfidfVectorizer,
    pub text_vectorizer: TfidfVectorizer,
}

impl ModelBundle {
    /// Load from `settings.dir`, or from `settings.fallback_dir` when the primary
    /// directory does not exist.
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let dir = resolve_dir(&settings.dir, &settings.fallback_dir)?;
        info!("Loading model bundle from {}", dir.display());

        let classifier = load_artifact(&dir, &settings.classifier_file, Classifier::from_json)?;
        let title_vectorizer =
            load_artifact(&dir, &settings.title_vectorizer_file, TfidfVectorizer::from_json)?;
        let text_vectorizer =
            load_artifact(&dir, &settings.text_vectorizer_file, TfidfVectorizer::from_json)?;

        let bundle = ModelBundle {
            classifier,
            title_vectorizer,
            text_vectorizer,
        };
        bundle.check_consistency()?;

        info!(
            title_features = bundle.title_vectorizer.dim(),
            text_features = bundle.text_vectorizer.dim(),
            classes = ?bundle.classifier.classes(),
            "Model bundle loaded"
        );
        Ok(bundle)
    }

    /// The classifier must consume exactly `[title | text]` features and only
    /// emit classes the label table knows.
    pub fn check_consistency(&self) -> Result<()> {
        let expected = self.title_vectorizer.dim() + self.text_vectorizer.dim();
        if self.classifier.n_features() != expected {
            return Err(AppError::startup(format!(
                "classifier expects {} features, vectorizers produce {} (title {} + text {})",
                self.classifier.n_features(),
                expected,
                self.title_vectorizer.dim(),
                self.text_vectorizer.dim()
            )));
        }
        if let Some(class) = self
            .classifier
            .classes()
            .iter()
            .find(|c| Sentiment::from_class(**c).is_err())
        {
            return Err(AppError::startup(format!(
                "classifier class {} has no sentiment label",
                class
            )));
        }
        Ok(())
    }
}

fn resolve_dir(primary: &Path, fallback: &Path) -> Result<PathBuf> {
    if primary.is_dir() {
        return Ok(primary.to_path_buf());
    }
    warn!(
        "Model directory {} not found, trying {}",
        primary.display(),
        fallback.display()
    );
    if fallback.is_dir() {
        Ok(fallback.to_path_buf())
    } else {
        Err(AppError::startup(format!(
            "no model directory at {} or {}",
            primary.display(),
            fallback.display()
        )))
    }
}

fn load_artifact<T>(dir: &Path, name: &str, parse: fn(&str) -> Result<T>) -> Result<T> {
    let path = dir.join(name);
    let src = std::fs::read_to_string(&path)
        .map_err(|e| AppError::startup(format!("cannot read {}: {}", path.display(), e)))?;
    parse(&src).map_err(|e| match e {
        AppError::Startup(msg) => AppError::startup(format!("{}: {}", path.display(), msg)),
        other => AppError::startup(format!("{}: {}", path.display(), other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &str, fallback: &str) -> ModelSettings {
        ModelSettings {
            dir: PathBuf::from(dir),
            fallback_dir: PathBuf::from(fallback),
            classifier_file: "classifier.json".into(),
            title_vectorizer_file: "tfidf_title.json".into(),
            text_vectorizer_file: "tfidf_text.json".into(),
        }
    }

    #[test]
    fn loads_fixture_bundle() {
        let b = ModelBundle::load(&settings("tests/fixtures/model", "/nonexistent")).unwrap();
        assert_eq!(b.classifier.classes(), &[0, 1, 2]);
        assert_eq!(
            b.classifier.n_features(),
            b.title_vectorizer.dim() + b.text_vectorizer.dim()
        );
    }

    #[test]
    fn falls_back_when_primary_missing() {
        let b = ModelBundle::load(&settings("tests/fixtures/no-such-dir", "tests/fixtures/model"));
        assert!(b.is_ok());
    }

    #[test]
    fn missing_everywhere_is_startup_failure() {
        let err = ModelBundle::load(&settings("tests/fixtures/no-such-dir", "/nonexistent")).unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }

    #[test]
    fn feature_mismatch_rejected() {
        let mut b = ModelBundle::load(&settings("tests/fixtures/model", "/nonexistent")).unwrap();
        b.title_vectorizer = TfidfVectorizer::from_json(r#"{"vocabulary": {}, "idf": [1.0]}"#).unwrap();
        assert!(matches!(b.check_consistency(), Err(AppError::Startup(_))));
    }

    #[test]
    fn unknown_class_rejected() {
        let mut b = ModelBundle::load(&settings("tests/fixtures/model", "/nonexistent")).unwrap();
        b.classifier = Classifier::from_json(&format!(
            r#"{{"kind": "linear", "classes": [0, 1, 7], "coef": [{row}, {row}, {row}], "intercept": [0, 0, 0]}}"#,
            row = format!("{:?}", vec![0.0; b.classifier.n_features()])
        ))
        .unwrap();
        assert!(matches!(b.check_consistency(), Err(AppError::Startup(_))));
    }
}
