use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Request input
    #[error("{0}")]
    Validation(String),

    // Scraping
    #[error("fetch failed for page {page}: {reason}")]
    UpstreamFetch { page: u32, reason: String },

    #[error("review {index} could not be extracted: {reason}")]
    Extraction { index: usize, reason: String },

    // Startup
    #[error("startup failure: {0}")]
    Startup(String),

    /// The classifier produced a class the label table does not know.
    #[error("classifier returned class {0}, which has no sentiment label")]
    InternalConsistency(i64),

    // Pass-through from dependencies
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn startup(msg: impl Into<String>) -> Self {
        AppError::Startup(msg.into())
    }
}
