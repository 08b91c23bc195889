use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::sparse::SparseVector;
use crate::error::{AppError, Result};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// A fitted TF-IDF transform, exported from the training environment as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

fn default_lowercase() -> bool {
    true
}

impl TfidfVectorizer {
    pub fn from_json(src: &str) -> Result<Self> {
        let v: TfidfVectorizer = serde_json::from_str(src)?;
        v.validate()?;
        Ok(v)
    }

    fn validate(&self) -> Result<()> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(AppError::startup(format!(
                "invalid ngram_range ({}, {})",
                lo, hi
            )));
        }
        if let Some((term, col)) = self.vocabulary.iter().find(|(_, c)| **c >= self.idf.len()) {
            return Err(AppError::startup(format!(
                "vocabulary term {:?} maps to column {} but idf has {} entries",
                term,
                col,
                self.idf.len()
            )));
        }
        Ok(())
    }

    /// Number of output features.
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, doc: &str) -> SparseVector {
        let text = if self.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&text).map(|m| m.as_str()).collect();

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in ngrams(&tokens, self.ngram_range) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let weighted = counts.into_iter().map(|(col, tf)| {
            let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
            (col, tf * self.idf[col])
        });
        let mut v = SparseVector::from_pairs(self.dim(), weighted);

        let norm = match self.norm {
            Some(Norm::L2) => v.l2_norm(),
            Some(Norm::L1) => v.l1_norm(),
            None => 0.0,
        };
        if norm > 0.0 {
            v.scale(1.0 / norm);
        }
        v
    }
}

/// Word n-grams joined by a single space, shortest first.
fn ngrams(tokens: &[&str], (lo, hi): (usize, usize)) -> Vec<String> {
    let mut out = Vec::new();
    for n in lo..=hi {
        if n > tokens.len() {
            break;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer(extra: &str) -> TfidfVectorizer {
        let json = format!(
            r#"{{"vocabulary": {{"good": 0, "phone": 1, "bad": 2, "good phone": 3}},
                "idf": [1.0, 2.0, 1.5, 3.0]{}}}"#,
            extra
        );
        TfidfVectorizer::from_json(&json).unwrap()
    }

    #[test]
    fn unigram_l2_normalized() {
        let v = vectorizer("");
        let out = v.transform("good good phone x");
        // tf-idf: good=2*1, phone=1*2 -> normalized by sqrt(8)
        let n = 8f64.sqrt();
        assert_eq!(out.dim(), 4);
        let cols: Vec<usize> = out.entries().iter().map(|(c, _)| *c).collect();
        assert_eq!(cols, vec![0, 1]);
        for (_, val) in out.entries() {
            assert!((val - 2.0 / n).abs() < 1e-12);
        }
        assert!((out.l2_norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bigrams_and_sublinear() {
        let v = vectorizer(r#", "ngram_range": [1, 2], "sublinear_tf": true, "norm": null"#);
        let out = v.transform("good phone");
        assert_eq!(out.entries(), &[(0, 1.0), (1, 2.0), (3, 3.0)]);
    }

    #[test]
    fn empty_and_unknown_text() {
        let v = vectorizer("");
        assert_eq!(v.transform("").nnz(), 0);
        assert_eq!(v.transform("unseen words only").nnz(), 0);
    }

    #[test]
    fn single_letter_tokens_ignored() {
        let v = vectorizer("");
        assert_eq!(v.transform("a b c").nnz(), 0);
    }

    #[test]
    fn rejects_out_of_range_vocabulary() {
        let err = TfidfVectorizer::from_json(r#"{"vocabulary": {"x": 5}, "idf": [1.0]}"#).unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }
}
