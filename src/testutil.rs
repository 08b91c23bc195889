use std::path::{Path, PathBuf};

use crate::inference::InferenceService;
use crate::model::ModelBundle;
use crate::settings::ModelSettings;
use crate::text::TextNormalizer;

pub fn service() -> InferenceService {
    let normalizer = TextNormalizer::load(Path::new("resources")).unwrap();
    let bundle = ModelBundle::load(&ModelSettings {
        dir: PathBuf::from("tests/fixtures/model"),
        fallback_dir: PathBuf::from("/nonexistent"),
        classifier_file: "classifier.json".into(),
        title_vectorizer_file: "tfidf_title.json".into(),
        text_vectorizer_file: "tfidf_text.json".into(),
    })
    .unwrap();
    InferenceService::new(normalizer, bundle)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "review_sentiment-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
