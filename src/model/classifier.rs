use serde::Deserialize;

use super::sparse::SparseVector;
use crate::error::{AppError, Result};

/// Fitted classifier parameters, tagged by `"kind"` in the exported JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    MultinomialNb {
        classes: Vec<i64>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    Linear {
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
}

impl Classifier {
    pub fn from_json(src: &str) -> Result<Self> {
        let c: Classifier = serde_json::from_str(src)?;
        c.validate()?;
        Ok(c)
    }

    pub fn classes(&self) -> &[i64] {
        match self {
            Classifier::MultinomialNb { classes, .. } | Classifier::Linear { classes, .. } => classes,
        }
    }

    /// Number of input features the parameters were fitted on.
    pub fn n_features(&self) -> usize {
        let rows = match self {
            Classifier::MultinomialNb {
                feature_log_prob, ..
            } => feature_log_prob,
            Classifier::Linear { coef, .. } => coef,
        };
        rows.first().map(Vec::len).unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        let classes = self.classes();
        if classes.is_empty() {
            return Err(AppError::startup("classifier has no classes"));
        }
        let (rows, biases, expected_rows) = match self {
            Classifier::MultinomialNb {
                class_log_prior,
                feature_log_prob,
                ..
            } => (feature_log_prob, class_log_prior, classes.len()),
            Classifier::Linear {
                coef, intercept, ..
            } => {
                if classes.len() < 2 {
                    return Err(AppError::startup(format!(
                        "linear classifier needs at least 2 classes, got {}",
                        classes.len()
                    )));
                }
                // binary linear models store a single row
                let expected = if classes.len() == 2 && coef.len() == 1 { 1 } else { classes.len() };
                (coef, intercept, expected)
            }
        };
        if rows.len() != expected_rows || biases.len() != expected_rows {
            return Err(AppError::startup(format!(
                "classifier shape mismatch: {} classes, {} weight rows, {} biases",
                classes.len(),
                rows.len(),
                biases.len()
            )));
        }
        let width = self.n_features();
        if rows.iter().any(|r| r.len() != width) {
            return Err(AppError::startup("classifier weight rows differ in length"));
        }
        Ok(())
    }

    /// Predicted class for one feature vector.
    pub fn predict(&self, x: &SparseVector) -> i64 {
        match self {
            Classifier::MultinomialNb {
                classes,
                class_log_prior,
                feature_log_prob,
            } => {
                let scores = feature_log_prob
                    .iter()
                    .zip(class_log_prior)
                    .map(|(row, prior)| prior + x.dot(row));
                classes[argmax(scores)]
            }
            Classifier::Linear {
                classes,
                coef,
                intercept,
            } => {
                if classes.len() == 2 && coef.len() == 1 {
                    let score = x.dot(&coef[0]) + intercept[0];
                    return if score > 0.0 { classes[1] } else { classes[0] };
                }
                let scores = coef.iter().zip(intercept).map(|(row, b)| b + x.dot(row));
                classes[argmax(scores)]
            }
        }
    }
}

/// Index of the first maximum.
fn argmax(scores: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, s) in scores.enumerate() {
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multinomial_nb_picks_highest_joint_log_likelihood() {
        let c = Classifier::from_json(
            r#"{"kind": "multinomial_nb", "classes": [0, 1, 2],
                "class_log_prior": [-1.0, -1.0, -1.0],
                "feature_log_prob": [[-1.0, -5.0], [-3.0, -3.0], [-5.0, -1.0]]}"#,
        )
        .unwrap();
        assert_eq!(c.n_features(), 2);
        assert_eq!(c.predict(&SparseVector::from_pairs(2, [(0, 1.0)])), 0);
        assert_eq!(c.predict(&SparseVector::from_pairs(2, [(1, 1.0)])), 2);
        // empty input falls back to the prior; ties go to the first class
        assert_eq!(c.predict(&SparseVector::zeros(2)), 0);
    }

    #[test]
    fn linear_multiclass_and_binary() {
        let multi = Classifier::from_json(
            r#"{"kind": "linear", "classes": [0, 1, 2],
                "coef": [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0]],
                "intercept": [0.0, 0.1, 0.0]}"#,
        )
        .unwrap();
        assert_eq!(multi.predict(&SparseVector::from_pairs(2, [(1, 2.0)])), 2);
        assert_eq!(multi.predict(&SparseVector::zeros(2)), 1);

        let binary = Classifier::from_json(
            r#"{"kind": "linear", "classes": [0, 2], "coef": [[1.0, -1.0]], "intercept": [0.0]}"#,
        )
        .unwrap();
        assert_eq!(binary.predict(&SparseVector::from_pairs(2, [(0, 1.0)])), 2);
        assert_eq!(binary.predict(&SparseVector::from_pairs(2, [(1, 1.0)])), 0);
    }

    #[test]
    fn shape_mismatch_is_a_startup_failure() {
        let err = Classifier::from_json(
            r#"{"kind": "multinomial_nb", "classes": [0, 1],
                "class_log_prior": [-1.0], "feature_log_prob": [[-1.0]]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }

    #[test]
    fn single_class_linear_model_is_rejected() {
        let err = Classifier::from_json(
            r#"{"kind": "linear", "classes": [2], "coef": [[1.0]], "intercept": [0.5]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));

        // one row for three classes is not a binary model either
        let err = Classifier::from_json(
            r#"{"kind": "linear", "classes": [0, 1, 2], "coef": [[1.0]], "intercept": [0.5]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Startup(_)));
    }
}
