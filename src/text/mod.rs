pub mod lemma;

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{AppError, Result};
use lemma::Lemmatizer;

pub const STOPWORDS_FILE: &str = "stopwords_english.txt";
pub const LEXICON_FILE: &str = "noun_lexicon.txt";
/// Sub-directory holding WordNet's `index.noun` and `noun.exc`.
pub const WORDNET_DIR: &str = "wordnet";

/// Lowercase, letters-only, stop-word-free, lemmatized text.
///
/// Built once at startup from the linguistic resources and shared read-only.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    stop_words: HashSet<String>,
    lemmatizer: Lemmatizer,
}

impl TextNormalizer {
    pub fn new(stop_words: HashSet<String>, lemmatizer: Lemmatizer) -> Self {
        TextNormalizer {
            stop_words,
            lemmatizer,
        }
    }

    /// Load `stopwords_english.txt` and the noun dictionary from `dir`.
    ///
    /// The dictionary is WordNet's `wordnet/index.noun` and `wordnet/noun.exc`
    /// when that directory exists, otherwise the bundled `noun_lexicon.txt`.
    /// A missing or empty resource is a startup failure.
    pub fn load(dir: &Path) -> Result<Self> {
        let stop_src = read_resource(dir, STOPWORDS_FILE)?;
        let stop_words = parse_word_list(&stop_src);
        if stop_words.is_empty() {
            return Err(AppError::startup(format!("{} is empty", STOPWORDS_FILE)));
        }

        let wordnet = dir.join(WORDNET_DIR);
        let (lemmatizer, source) = if wordnet.is_dir() {
            let index = read_resource(&wordnet, "index.noun")?;
            let exc = read_resource(&wordnet, "noun.exc")?;
            (Lemmatizer::from_wordnet(&index, &exc), "wordnet/index.noun")
        } else {
            warn!(
                "{} not found, lemmatizing with the bundled {}",
                wordnet.display(),
                LEXICON_FILE
            );
            let lex_src = read_resource(dir, LEXICON_FILE)?;
            (Lemmatizer::from_lexicon(&lex_src), LEXICON_FILE)
        };
        if lemmatizer.is_empty() {
            return Err(AppError::startup(format!("{} is empty", source)));
        }

        info!(
            stop_words = stop_words.len(),
            lexicon = lemmatizer.len(),
            "Loaded linguistic resources from {}",
            dir.display()
        );
        Ok(Self::new(stop_words, lemmatizer))
    }

    pub fn normalize(&self, input: &str) -> String {
        let lowered = input.to_lowercase();
        let letters: String = lowered
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
            .collect();

        letters
            .split_whitespace()
            .filter(|tok| !self.stop_words.contains(*tok))
            .map(|tok| self.lemmatizer.lemmatize(tok))
            // a lemma can land on a stop word; drop it so the output is a fixed point
            .filter(|lemma| !self.stop_words.contains(&**lemma))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn read_resource(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::read_to_string(&path)
        .map_err(|e| AppError::startup(format!("cannot read {}: {}", path.display(), e)))
}

fn parse_word_list(src: &str) -> HashSet<String> {
    src.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> TextNormalizer {
        TextNormalizer::load(Path::new("resources")).unwrap()
    }

    #[test]
    fn strips_punctuation_digits_and_stop_words() {
        let n = fixture();
        assert_eq!(
            n.normalize("This phone is AWESOME!!! 10/10, the batteries last 2 days."),
            "phone awesome battery last day"
        );
    }

    #[test]
    fn removes_accents_and_emoji() {
        let n = fixture();
        assert_eq!(n.normalize("Café 😀 good"), "caf good");
    }

    #[test]
    fn empty_input() {
        let n = fixture();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \t\n"), "");
        assert_eq!(n.normalize("the and of"), "");
        assert_eq!(n.normalize("1234 !!!"), "");
    }

    #[test]
    fn output_shape_and_idempotence() {
        let n = fixture();
        let inputs = [
            "Worst purchase EVER. Cameras are blurry; boxes arrived damaged...",
            "  Multiple   spaces\tand\nnewlines  ",
            "Ünïcödé wörds & symbols #hashtag @user",
            "Women's watches, children's toys",
            "",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert!(
                once.chars().all(|c| c.is_ascii_lowercase() || c == ' '),
                "unexpected char in {:?}",
                once
            );
            assert!(!once.contains("  "));
            assert_eq!(once.trim(), once);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn wordnet_dictionary_takes_precedence() {
        let n = TextNormalizer::load(Path::new("tests/fixtures/wordnet_resources")).unwrap();
        assert_eq!(
            n.normalize("Scratches and drops, dead pixels on the screens!"),
            "scratch drop dead pixel screen"
        );
        assert_eq!(n.normalize("The geese"), "goose");
    }

    #[test]
    fn incomplete_wordnet_dir_fails_at_startup() {
        let dir = crate::testutil::scratch_dir("wordnet-partial");
        std::fs::write(dir.join(STOPWORDS_FILE), "the\n").unwrap();
        std::fs::create_dir_all(dir.join(WORDNET_DIR)).unwrap();
        std::fs::write(dir.join(WORDNET_DIR).join("index.noun"), "phone n 1 1 @ 1 0 1\n").unwrap();
        let err = TextNormalizer::load(&dir).unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_resources_fail_at_startup() {
        let err = TextNormalizer::load(Path::new("tests/fixtures/does-not-exist")).unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }
}
