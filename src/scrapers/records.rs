//! Lesson-accounting page parser.
//!
//! Accounting pages list, per subject and group, how many academic hours
//! were planned for the semester and how many were actually delivered.
//! Unlike schedule pages the table is regular: one header row, then one
//! record per row with fixed column positions:
//!
//! | # | Column |
//! |---|--------|
//! | 0 | record number (`"1."`) |
//! | 1 | lecturer |
//! | 2 | group |
//! | 3 | subgroup |
//! | 4 | subject |
//! | 5 | lesson type |
//! | 6-9 | semester hours: total, planned, actual, remaining |
//! | 10-11 | weekly hours: planned, actual |
//! | 12 | end date |
//! | 13 | progress bar image, percentage in `alt` |
//!
//! Numbers use a decimal comma.

use crate::api::PageFetcher;
use crate::config::AppConfig;
use crate::models::{Record, RecordsPage, SemesterHours, WeekHours};
use crate::scrapers::codec::fetch_text;
use crate::scrapers::{
    CELL, DATA_TABLE, ParseError, ROW, element_text, parse_page_header, prepare_document,
};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::{debug, info, instrument, warn};

static PROGRESS_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("valid image selector"));

/// Rows with fewer cells than this are layout rows, not records.
const MIN_RECORD_CELLS: usize = 6;

fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim().replace(',', ".");
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_record(cells: &[ElementRef<'_>]) -> Record {
    let text = |i: usize| {
        cells
            .get(i)
            .map(|c| element_text(c).trim().to_string())
            .unwrap_or_default()
    };
    let number = |i: usize| parse_decimal(&text(i));
    let progress = cells
        .get(13)
        .and_then(|c| c.select(&PROGRESS_IMAGE).next())
        .and_then(|img| img.value().attr("alt"))
        .and_then(parse_decimal);

    Record {
        number: text(0).replace('.', "").parse().ok(),
        lecturer: text(1),
        group: text(2),
        subgroup: text(3).parse().unwrap_or(0),
        name: text(4),
        lesson_type: text(5),
        semester: SemesterHours {
            total: number(6),
            planned: number(7),
            actual: number(8),
            remaining: number(9),
        },
        week: WeekHours {
            planned: number(10),
            actual: number(11),
        },
        end_date: text(12),
        progress,
    }
}

/// Parse a lesson-accounting page.
///
/// # Errors
///
/// [`ParseError::TableNotFound`] when the page has no records table.
pub fn parse_records(html: &str, config: &AppConfig) -> Result<RecordsPage, ParseError> {
    let document = prepare_document(html);
    let header = parse_page_header(&document, config);
    let table = document
        .select(&DATA_TABLE)
        .next()
        .ok_or(ParseError::TableNotFound)?;

    let records: Vec<Record> = table
        .select(&ROW)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            (cells.len() >= MIN_RECORD_CELLS).then(|| parse_record(&cells))
        })
        .collect();

    debug!(source = %header.source_name, count = records.len(), "Parsed records");
    Ok(RecordsPage {
        source_kind: header.source_kind,
        source_name: header.source_name,
        last_modified: header.last_modified,
        records,
    })
}

/// Fetch a lesson-accounting page and parse it.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn fetch_records<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    config: &AppConfig,
) -> Option<RecordsPage> {
    let html = fetch_text(fetcher, url).await?;
    match parse_records(&html, config) {
        Ok(page) => {
            info!(source = %page.source_name, count = page.records.len(), "Fetched records");
            Some(page)
        }
        Err(e) => {
            warn!(%url, error = %e, "Records page could not be parsed");
            None
        }
    }
}
