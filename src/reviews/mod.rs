pub mod fields;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::AppError;

static PRIMARY_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.cPHDOP").unwrap());
static LEGACY_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div._27M712").unwrap());

/// CSV column order of a persisted review.
pub const COLUMNS: [&str; 10] = [
    "Page",
    "Review_ID",
    "Author_Name",
    "Rating_Stars",
    "Review_Title",
    "Review_Text",
    "City",
    "Posted_Date",
    "Helpful_Count",
    "Certified_Buyer",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "Page")]
    pub page: u32,
    #[serde(rename = "Review_ID")]
    pub review_id: String,
    #[serde(rename = "Author_Name")]
    pub author: String,
    #[serde(rename = "Rating_Stars")]
    pub rating: String,
    #[serde(rename = "Review_Title")]
    pub title: String,
    #[serde(rename = "Review_Text")]
    pub text: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Posted_Date")]
    pub posted_date: String,
    #[serde(rename = "Helpful_Count")]
    pub helpful_count: String,
    #[serde(
        rename = "Certified_Buyer",
        serialize_with = "yes_no",
        deserialize_with = "from_yes_no"
    )]
    pub certified_buyer: bool,
}

fn yes_no<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *v { "Yes" } else { "No" })
}

fn from_yes_no<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let s = String::deserialize(d)?;
    Ok(s.eq_ignore_ascii_case("yes"))
}

pub fn review_id(page: u32, index: usize) -> String {
    format!("P{}_REV_{:03}", page, index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Primary,
    Legacy,
}

/// Result of extracting one page, with the containers that had to be skipped.
#[derive(Debug)]
pub struct PageReviews {
    pub layout: Option<Layout>,
    pub records: Vec<ReviewRecord>,
    pub skipped: Vec<AppError>,
}

/// Extract every review on a page. Broken review blocks are logged, collected
/// in `skipped` and dropped from `records`.
pub fn extract_page(html: &str, page: u32) -> PageReviews {
    let document = Html::parse_document(html);

    // one layout per document, never merged
    let mut layout = Some(Layout::Primary);
    let mut containers: Vec<ElementRef> = document.select(&PRIMARY_CONTAINER).collect();
    if containers.is_empty() {
        layout = Some(Layout::Legacy);
        containers = document.select(&LEGACY_CONTAINER).collect();
    }
    if containers.is_empty() {
        layout = None;
    }
    debug!(page, ?layout, containers = containers.len(), "Located review containers");

    let mut records = Vec::with_capacity(containers.len());
    let mut skipped = Vec::new();
    for (i, container) in containers.into_iter().enumerate() {
        let index = i + 1;
        match extract_review(container, page, index) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(page, "{}", e);
                skipped.push(e);
            }
        }
    }

    PageReviews {
        layout,
        records,
        skipped,
    }
}

fn extract_review(c: ElementRef, page: u32, index: usize) -> Result<ReviewRecord, AppError> {
    let rating = fields::rating(c).map_err(|reason| AppError::Extraction { index, reason })?;
    Ok(ReviewRecord {
        page,
        review_id: review_id(page, index),
        author: fields::author(c),
        rating,
        title: fields::title(c),
        text: fields::body(c),
        city: fields::city(c),
        posted_date: fields::posted_date(c),
        helpful_count: fields::helpful_count(c),
        certified_buyer: fields::certified_buyer(c),
    })
}
