use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

use crate::reviews::{ReviewRecord, COLUMNS};

pub const HTML_PREFIX: &str = "review_html_";
pub const CSV_PREFIX: &str = "review_csv_";

// ── Writing ──

/// Header plus one row per record; an empty page still gets its header.
pub fn write_records<W: Write>(out: W, records: &[ReviewRecord]) -> Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(out);
    w.write_record(COLUMNS)?;
    for r in records {
        w.serialize(r)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[ReviewRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(file, records)
}

pub fn read_csv(path: &Path) -> Result<Vec<ReviewRecord>> {
    let mut r = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    check_header(r.headers()?, path)?;
    let rows = r
        .deserialize()
        .collect::<Result<Vec<ReviewRecord>, _>>()
        .with_context(|| format!("Malformed row in {}", path.display()))?;
    Ok(rows)
}

fn check_header(header: &csv::StringRecord, path: &Path) -> Result<()> {
    if header.iter().ne(COLUMNS.iter().copied()) {
        bail!(
            "{} has columns [{}], expected [{}]",
            path.display(),
            header.iter().collect::<Vec<_>>().join(", "),
            COLUMNS.join(", ")
        );
    }
    Ok(())
}

// ── File naming ──

pub fn page_html_path(dir: &Path, page: u32) -> PathBuf {
    dir.join(format!("{}{}.html", HTML_PREFIX, page))
}

pub fn page_csv_path(dir: &Path, page: u32) -> PathBuf {
    dir.join(format!("{}{}.csv", CSV_PREFIX, page))
}

/// Page number from a `<prefix><N>.<ext>` file name.
pub fn page_number(path: &Path, prefix: &str, ext: &str) -> Option<u32> {
    if path.extension()?.to_str()? != ext {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(prefix)?
        .parse()
        .ok()
}

/// All `<prefix><N>.<ext>` files in `dir`, ascending by page number.
pub fn list_pages(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<(u32, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if let Some(n) = page_number(&path, prefix, ext) {
            pages.push((n, path));
        }
    }
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages)
}

/// Keep ASCII letters and digits only.
pub fn sanitize_name(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// `<Product>_<Site>_R<pages>_D<DDMMYY>_<Author>_fetched.csv`
pub fn merged_file_name(product: &str, site: &str, pages: u32, date: &str, author: &str) -> String {
    format!(
        "{}_{}_R{}_D{}_{}_fetched.csv",
        sanitize_name(product),
        sanitize_name(site),
        pages,
        sanitize_name(date),
        sanitize_name(author)
    )
}

// ── Merging ──

/// Concatenate per-page CSVs in ascending page order into `out`.
/// Returns the number of data rows written.
pub fn merge_dir(input: &Path, out: &Path) -> Result<usize> {
    let pages = list_pages(input, CSV_PREFIX, "csv")?;
    if pages.is_empty() {
        bail!("No {}<N>.csv files found in {}", CSV_PREFIX, input.display());
    }
    let files: Vec<PathBuf> = pages.into_iter().map(|(_, p)| p).collect();
    merge_files(&files, out)
}

pub fn merge_files(files: &[PathBuf], out: &Path) -> Result<usize> {
    let mut merged = Vec::new();
    for f in files {
        merged.extend(read_csv(f)?);
    }
    write_csv(out, &merged)?;
    Ok(merged.len())
}
