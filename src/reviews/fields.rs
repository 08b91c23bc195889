use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::warn;

pub const ANONYMOUS: &str = "Anonymous";
pub const NOT_AVAILABLE: &str = "N/A";

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Ordered selector candidates for one field; the first one that matches
/// anything inside the container wins.
pub struct Chain(Vec<Selector>);

impl Chain {
    pub fn new(candidates: &[&str]) -> Self {
        Chain(
            candidates
                .iter()
                .map(|css| Selector::parse(css).unwrap())
                .collect(),
        )
    }

    pub fn first<'a>(&self, container: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.0.iter().find_map(|sel| container.select(sel).next())
    }
}

/// Every selector the review markup has used, current layout first.
pub struct Selectors {
    pub author: Chain,
    pub rating: Chain,
    pub title: Chain,
    pub body: Chain,
    pub location: Chain,
    pub helpful: Chain,
    pub dated: Selector,
    pub dated_legacy: Selector,
    pub nested_div: Selector,
}

pub static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    author: Chain::new(&["p._2NsDsF.AwS1CA", "p._2sc7ZR._1M4jBT"]),
    rating: Chain::new(&["div.XQDdHH", "div._3LWZlK"]),
    title: Chain::new(&["p.z9E0IG", "p._2-N8zT"]),
    body: Chain::new(&["div.ZmyHeo", "div.t-ZTKy"]),
    location: Chain::new(&["p.MztJPv", "p._2mcZGG"]),
    helpful: Chain::new(&["span.tl9VpF", "span._18Nubb"]),
    dated: Selector::parse("p._2NsDsF").unwrap(),
    dated_legacy: Selector::parse("p._2sc7ZR").unwrap(),
    nested_div: Selector::parse("div").unwrap(),
});

pub fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>()
}

// ── Field strategies ──

pub fn author(c: ElementRef) -> String {
    SELECTORS
        .author
        .first(c)
        .map(|el| text_of(el).trim().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

/// First character of the rating text. A rating node with no text is an error.
pub fn rating(c: ElementRef) -> Result<String, String> {
    let Some(el) = SELECTORS.rating.first(c) else {
        return Ok(NOT_AVAILABLE.to_string());
    };
    let raw = text_of(el);
    let raw = raw.trim();
    let first = raw
        .chars()
        .next()
        .ok_or_else(|| "rating element has no text".to_string())?;
    if raw.chars().take_while(char::is_ascii_digit).count() > 1 {
        warn!(rating = raw, "Multi-digit rating truncated to its first character");
    }
    Ok(first.to_string())
}

pub fn title(c: ElementRef) -> String {
    SELECTORS
        .title
        .first(c)
        .map(|el| text_of(el).trim().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Body text lives in the first nested `div` when there is one.
pub fn body(c: ElementRef) -> String {
    let Some(el) = SELECTORS.body.first(c) else {
        return NOT_AVAILABLE.to_string();
    };
    let inner = el.select(&SELECTORS.nested_div).next().unwrap_or(el);
    text_of(inner).trim().to_string()
}

pub fn city(c: ElementRef) -> String {
    SELECTORS
        .location
        .first(c)
        .map(|el| city_from_location(&text_of(el)))
        .unwrap_or_default()
}

pub fn posted_date(c: ElementRef) -> String {
    let dated: Vec<String> = c
        .select(&SELECTORS.dated)
        .map(|el| text_of(el).trim().to_string())
        .collect();
    let legacy = c
        .select(&SELECTORS.dated_legacy)
        .next()
        .map(|el| text_of(el).trim().to_string());
    pick_date(&dated, legacy.as_deref())
}

pub fn helpful_count(c: ElementRef) -> String {
    SELECTORS
        .helpful
        .first(c)
        .map(|el| first_number(&text_of(el)))
        .unwrap_or_else(|| "0".to_string())
}

pub fn certified_buyer(c: ElementRef) -> bool {
    text_of(c).to_lowercase().contains("certified buyer")
}

// ── Text rules ──

/// Trailing segment after the last comma; no comma means no city.
pub fn city_from_location(location: &str) -> String {
    location
        .rsplit_once(',')
        .map(|(_, city)| city.trim().to_string())
        .unwrap_or_default()
}

pub fn first_number(text: &str) -> String {
    DIGITS_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// With several date-labelled nodes the last one is the posting date (the
/// first is the author line or a "time since purchase"). Otherwise the legacy
/// node is accepted only when it reads like a duration.
pub fn pick_date(dated: &[String], legacy: Option<&str>) -> String {
    if dated.len() > 1 {
        return dated[dated.len() - 1].clone();
    }
    match legacy {
        Some(text) if looks_like_duration(text) => text.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn looks_like_duration(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("ago") || lower.contains("month") || lower.contains("day")
}
