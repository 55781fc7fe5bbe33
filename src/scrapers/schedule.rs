//! Schedule page parser.
//!
//! A schedule page is one `table.inf` with no stable schema. The first two
//! rows are headers. After that, a row whose first cell holds a date
//! (`"02.09.2024\nПн"`, no colon) opens a new day; every row, including the
//! day-opening one, may carry one lesson slot:
//!
//! ```text
//! | 02.09.2024\nПн | 1 | <z1>Физика</z1><z2>204</z2><z3>Иванов</z3>  |                 |
//! |                | 2 | <z1>Химия (1)</z1>...                       | <z1>Химия (2)</z1>...  |
//! ```
//!
//! Cells after the slot number hold one subgroup each. Inside a cell, three
//! classes (`z1`, `z2`, `z3`) mark the three fields of the assignment;
//! their meaning depends on which kind of page is being read.
//!
//! Rows are folded into a scan state that holds the finished days and
//! the day currently being filled.

use crate::api::PageFetcher;
use crate::config::AppConfig;
use crate::models::{Day, Lesson, Ordinal, Schedule, SourceKind};
use crate::scrapers::codec::fetch_text;
use crate::scrapers::{
    CELL, DATA_TABLE, LINE_BREAK_MARKER, ParseError, ROW, element_text, parse_page_header,
    prepare_document,
};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, info, instrument, warn};

static SLOT_SELECTORS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [".z1", ".z2", ".z3"].map(|css| Selector::parse(css).expect("valid slot selector"))
});

static SUBGROUP_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("valid subgroup regex"));

/// The three marked fields of one assignment cell, in class order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    pub first: String,
    pub second: String,
    pub third: String,
}

/// Semantic fields of a lesson after slot assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonFields {
    pub name: String,
    pub room: Option<String>,
    pub lecturer: Option<String>,
    pub group: Option<String>,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Group page: subject, room, lecturer.
fn group_fields(slots: Slots) -> LessonFields {
    LessonFields {
        name: slots.first,
        room: non_empty(slots.second),
        lecturer: non_empty(slots.third),
        group: None,
    }
}

/// Lecturer page: group, room, subject.
fn lecturer_fields(slots: Slots) -> LessonFields {
    LessonFields {
        name: slots.third,
        room: non_empty(slots.second),
        lecturer: None,
        group: non_empty(slots.first),
    }
}

/// Room page: group, subject, lecturer.
fn room_fields(slots: Slots) -> LessonFields {
    LessonFields {
        name: slots.second,
        room: None,
        lecturer: non_empty(slots.third),
        group: non_empty(slots.first),
    }
}

/// Map the raw slots of a cell to lesson fields for the given page kind.
///
/// A trailing `(N)` subgroup annotation is removed from the name.
pub fn assign_slots(kind: SourceKind, slots: Slots) -> LessonFields {
    let mut fields = match kind {
        SourceKind::Group => group_fields(slots),
        SourceKind::Lecturer => lecturer_fields(slots),
        SourceKind::Room => room_fields(slots),
    };
    fields.name = SUBGROUP_SUFFIX.replace(&fields.name, "").into_owned();
    fields
}

/// Read the `z1`/`z2`/`z3` fields of one assignment cell.
///
/// Several elements with the same class are joined with `", "`.
pub fn extract_slots(cell: &ElementRef<'_>) -> Slots {
    let [first, second, third] = SLOT_SELECTORS.each_ref().map(|sel| {
        cell.select(sel)
            .map(|el| element_text(&el).replace(LINE_BREAK_MARKER, " ").trim().to_string())
            .filter(|text| !text.is_empty())
            .join(", ")
    });
    Slots {
        first,
        second,
        third,
    }
}

/// A day-header cell has no colon (which would make it a slot time) and is
/// longer than a bare slot number.
fn is_day_header(text: &str) -> bool {
    !text.contains(':') && text.chars().count() > 1
}

/// Split a day-header cell into date and weekday token.
fn split_day_header(text: &str) -> (String, String) {
    let mut parts = text.split(LINE_BREAK_MARKER);
    let date = parts.next().unwrap_or_default().trim().to_string();
    let token = parts.next().unwrap_or_default().trim().to_string();
    (date, token)
}

/// Accumulator threaded through the row fold.
#[derive(Debug, Default)]
struct ScanState {
    days: Vec<Day>,
    current: Option<Day>,
}

impl ScanState {
    fn open_day(mut self, day: Day) -> Self {
        if let Some(previous) = self.current.replace(day) {
            self.days.push(previous);
        }
        self
    }

    fn push_lessons(mut self, lessons: Vec<Lesson>) -> Self {
        match self.current.as_mut() {
            Some(day) => day.lessons.extend(lessons),
            None if !lessons.is_empty() => {
                debug!(count = lessons.len(), "Dropping lessons listed before any day header");
            }
            None => {}
        }
        self
    }

    fn finish(mut self) -> Vec<Day> {
        if let Some(last) = self.current.take() {
            self.days.push(last);
        }
        self.days
    }
}

/// Per-page inputs needed to turn a row into lessons.
struct RowContext<'a> {
    kind: Option<SourceKind>,
    config: &'a AppConfig,
}

fn scan_row(state: ScanState, row: ElementRef<'_>, ctx: &RowContext<'_>) -> ScanState {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    let Some(first) = cells.first() else {
        return state;
    };
    let first_text = element_text(first);
    let first_text = first_text.trim();

    let (state, offset) = if is_day_header(first_text) {
        let (date, weekday_token) = split_day_header(first_text);
        let weekday = ctx.config.weekday_name(&weekday_token).map(str::to_string);
        if weekday.is_none() {
            debug!(%date, token = %weekday_token, "Unrecognized weekday token");
        }
        let day = Day {
            date,
            weekday_token,
            weekday,
            lessons: Vec::new(),
        };
        (state.open_day(day), 1)
    } else if cells.len() >= 2 {
        (state, 0)
    } else {
        return state;
    };

    let weekday_token = match &state.current {
        Some(day) => day.weekday_token.clone(),
        None => String::new(),
    };
    let ordinal = cells
        .get(offset)
        .map(|cell| Ordinal::from_cell(&element_text(cell)))
        .unwrap_or(Ordinal::Unscheduled);
    let bells = ctx.config.bells.resolve(ordinal, &weekday_token).to_string();

    let assignments = cells.get(offset + 1..).unwrap_or_default();
    let split = assignments.len() > 1;

    let lessons = assignments
        .iter()
        .enumerate()
        .filter(|(_, cell)| {
            !element_text(cell)
                .replace(LINE_BREAK_MARKER, "")
                .trim()
                .is_empty()
        })
        .map(|(k, cell)| {
            let fields = ctx
                .kind
                .map(|kind| assign_slots(kind, extract_slots(cell)))
                .unwrap_or_default();
            Lesson {
                ordinal,
                bells: bells.clone(),
                subgroup: if split { (k + 1).min(u8::MAX as usize) as u8 } else { 0 },
                name: fields.name,
                room: fields.room,
                lecturer: fields.lecturer,
                group: fields.group,
            }
        })
        .collect();

    state.push_lessons(lessons)
}

/// Parse a schedule page.
///
/// The page title decides how assignment cells are read; `kind_hint` is
/// used only when the title label is not a configured kind.
///
/// # Errors
///
/// [`ParseError::TableNotFound`] when the page has no schedule table. A
/// title that does not match `"<label>: <name>"` is not an error: the
/// schedule comes back with an empty `source_name`.
pub fn parse_schedule(
    html: &str,
    kind_hint: Option<SourceKind>,
    config: &AppConfig,
) -> Result<Schedule, ParseError> {
    let document = prepare_document(html);
    let header = parse_page_header(&document, config);
    let table = document
        .select(&DATA_TABLE)
        .next()
        .ok_or(ParseError::TableNotFound)?;

    let ctx = RowContext {
        kind: header.source_kind.kind().or(kind_hint),
        config,
    };
    let days = table
        .select(&ROW)
        .skip(2)
        .fold(ScanState::default(), |state, row| scan_row(state, row, &ctx))
        .finish();

    let schedule = Schedule {
        source_kind: header.source_kind,
        source_name: header.source_name,
        last_modified: header.last_modified,
        days,
    };
    debug!(
        source = %schedule.source_name,
        days = schedule.days.len(),
        lessons = schedule.lesson_count(),
        "Parsed schedule"
    );
    Ok(schedule)
}

/// Fetch a schedule page and parse it.
///
/// Returns `None` when the page could not be fetched or has no schedule table.
#[instrument(level = "info", skip(fetcher, config))]
pub async fn fetch_schedule<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    kind: SourceKind,
    config: &AppConfig,
) -> Option<Schedule> {
    let html = fetch_text(fetcher, url).await?;
    match parse_schedule(&html, Some(kind), config) {
        Ok(schedule) => {
            info!(
                source = %schedule.source_name,
                days = schedule.days.len(),
                "Fetched schedule"
            );
            Some(schedule)
        }
        Err(e) => {
            warn!(%url, error = %e, "Schedule page could not be parsed");
            None
        }
    }
}
