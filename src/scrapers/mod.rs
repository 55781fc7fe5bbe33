//! Scrapers for the institution's static schedule site.
//!
//! The site publishes plain HTML generated by a desktop timetabling tool.
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: Discover sources (groups, lecturers, rooms) from the
//!    per-kind index pages ([`catalog`])
//! 2. **Fetching**: Download one source's detail page and parse it
//!    ([`schedule`], [`records`])
//!
//! # Submodules
//!
//! | Module | Page | Output |
//! |--------|------|--------|
//! | [`codec`] | any | Unicode text from raw bytes |
//! | [`catalog`] | `cg.htm`, `cp.htm`, `ca.htm`, `vg.htm`, `vp.htm` | [`LinkCatalog`](crate::models::LinkCatalog) |
//! | [`schedule`] | per-source schedule page | [`Schedule`](crate::models::Schedule) |
//! | [`records`] | per-source accounting page | [`RecordsPage`](crate::models::RecordsPage) |
//! | [`status`] | `index.htm` | [`ProbeResult`](crate::models::ProbeResult) |
//!
//! # Common Page Layout
//!
//! Detail pages share a header: an `h1` reading `"<label>: <name>"`, a
//! `div.ref` caption reading `"Обновлено: DD.MM.YYYY в HH:mm."` and one
//! `table.inf` holding the data.

pub mod catalog;
pub mod codec;
pub mod records;
pub mod schedule;
pub mod status;

use crate::config::AppConfig;
use crate::models::{LastModified, SourceLabel};
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Two-character marker that stands in for `<br>` tags in extracted text.
pub const LINE_BREAK_MARKER: &str = "\\n";

/// Template of the "last modified" caption.
pub const LAST_MODIFIED_FORMAT: &str = "Обновлено: %d.%m.%Y в %H:%M.";

pub(crate) static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1"));
pub(crate) static CAPTION: Lazy<Selector> = Lazy::new(|| selector("div.ref"));
pub(crate) static DATA_TABLE: Lazy<Selector> = Lazy::new(|| selector("table.inf"));
pub(crate) static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
pub(crate) static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));
static TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^:]+): (.+)").expect("valid title regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

/// Why a detail page could not be parsed at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The page has no `table.inf` data table.
    #[error("data table `table.inf` not found")]
    TableNotFound,
}

/// Title and caption data common to every detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub source_kind: SourceLabel,
    /// Empty when the title does not match `"<label>: <name>"`.
    pub source_name: String,
    pub last_modified: LastModified,
}

/// Parse page text into a document, turning `<br>` tags into [`LINE_BREAK_MARKER`].
pub fn prepare_document(html: &str) -> Html {
    let html = LINE_BREAK.replace_all(html, LINE_BREAK_MARKER);
    Html::parse_document(&html)
}

/// Concatenated text content of an element.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Split an `h1` title into its label and source name.
pub fn parse_title(title: &str) -> Option<(String, String)> {
    let caps = TITLE_PATTERN.captures(title.trim())?;
    let label = caps.get(1)?.as_str().trim().to_string();
    let name = caps.get(2)?.as_str().trim().to_string();
    Some((label, name))
}

/// Parse the "last modified" caption in the site's publishing zone.
///
/// Anything that does not match [`LAST_MODIFIED_FORMAT`] is
/// [`LastModified::Unknown`].
pub fn parse_last_modified(caption: &str, offset: FixedOffset) -> LastModified {
    NaiveDateTime::parse_from_str(caption.trim(), LAST_MODIFIED_FORMAT)
        .ok()
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| LastModified::At(dt.timestamp()))
        .unwrap_or(LastModified::Unknown)
}

/// Read the title and caption shared by schedule and records pages.
pub fn parse_page_header(document: &Html, config: &AppConfig) -> PageHeader {
    let title = document
        .select(&TITLE)
        .next()
        .map(|h1| element_text(&h1))
        .unwrap_or_default();
    let caption = document
        .select(&CAPTION)
        .next()
        .map(|div| element_text(&div))
        .unwrap_or_default();

    let (label, source_name) = parse_title(&title).unwrap_or_default();
    let source_kind = match config.kind_for_label(&label) {
        Some(kind) => SourceLabel::Known(kind),
        None => SourceLabel::Unrecognized(label),
    };

    PageHeader {
        source_kind,
        source_name,
        last_modified: parse_last_modified(&caption, config.utc_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_title() {
        assert_eq!(
            parse_title("Группа: ИС-21"),
            Some(("Группа".to_string(), "ИС-21".to_string()))
        );
        assert_eq!(
            parse_title("  Преподаватель: Иванов И.И.  "),
            Some(("Преподаватель".to_string(), "Иванов И.И.".to_string()))
        );
        assert_eq!(parse_title("Расписание занятий"), None);
        assert_eq!(parse_title(""), None);
    }

    #[test]
    fn test_parse_last_modified() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let parsed = parse_last_modified("Обновлено: 02.09.2024 в 14:30.", offset);
        let LastModified::At(ts) = parsed else {
            panic!("expected a timestamp, got {:?}", parsed);
        };
        let local = offset.timestamp_opt(ts, 0).unwrap();
        assert_eq!((local.day(), local.month(), local.year()), (2, 9, 2024));
        assert_eq!((local.hour(), local.minute()), (14, 30));
    }

    #[test]
    fn test_parse_last_modified_unknown() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert_eq!(parse_last_modified("", offset), LastModified::Unknown);
        assert_eq!(
            parse_last_modified("Обновлено: вчера", offset),
            LastModified::Unknown
        );
    }

    #[test]
    fn test_prepare_document_replaces_line_breaks() {
        let doc = prepare_document("<p>02.09.2024<BR>Пн<br/>x<br />y</p>");
        let p = doc.select(&selector("p")).next().unwrap();
        assert_eq!(element_text(&p), "02.09.2024\\nПн\\nx\\ny");
    }

    #[test]
    fn test_parse_page_header_unrecognized_label() {
        let config = AppConfig::default();
        let doc = prepare_document("<h1>Кафедра: Информатика</h1><div class=\"ref\">???</div>");
        let header = parse_page_header(&doc, &config);
        assert_eq!(
            header.source_kind,
            SourceLabel::Unrecognized("Кафедра".to_string())
        );
        assert_eq!(header.source_name, "Информатика");
        assert_eq!(header.last_modified, LastModified::Unknown);
    }

    #[test]
    fn test_parse_page_header_known_label() {
        let config = AppConfig::default();
        let doc = prepare_document("<h1>Аудитория: 101</h1>");
        let header = parse_page_header(&doc, &config);
        assert_eq!(header.source_kind, SourceLabel::Known(SourceKind::Room));
        assert_eq!(header.source_name, "101");
    }
}
