//! Data models for scraped schedule sources and their parsed representations.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`SourceKind`]: The three schedule perspectives the site publishes
//! - [`SourceEntry`], [`SourceList`], [`LinkCatalog`]: Discovered sources per kind
//! - [`Schedule`], [`Day`], [`Lesson`]: A parsed schedule page
//! - [`RecordsPage`], [`Record`]: A parsed lesson-accounting page
//! - [`ProbeResult`]: Outcome of a site health check
//!
//! Schedules are built fresh for every request and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the three schedule perspectives published by the institution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A student group.
    Group,
    /// A lecturer.
    Lecturer,
    /// A classroom.
    Room,
}

impl SourceKind {
    /// Every kind, in catalog order.
    pub const ALL: [SourceKind; 3] = [SourceKind::Group, SourceKind::Lecturer, SourceKind::Room];

    /// Stable lowercase identifier (`"group"`, `"lecturer"`, `"room"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Group => "group",
            SourceKind::Lecturer => "lecturer",
            SourceKind::Room => "room",
        }
    }

    /// Localized noun used in message headers ("Расписание группы ...").
    pub fn genitive(&self) -> &'static str {
        match self {
            SourceKind::Group => "группы",
            SourceKind::Lecturer => "преподавателя",
            SourceKind::Room => "аудитории",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable source: its display name and the absolute URL of its detail page.
///
/// The display name is already truncated to the transport limit when the
/// entry is created, so two distinct sources may share a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Name shown to users, at most 28 UTF-16 code units.
    pub display_name: String,
    /// Absolute URL of the source's detail page.
    pub detail_url: String,
}

/// Ordered list of sources for one kind, keyed by display name.
///
/// Inserting a name that is already present replaces its URL in place
/// (last write wins, first position kept).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceList {
    entries: Vec<SourceEntry>,
}

impl SourceList {
    /// Insert or replace an entry by display name.
    pub fn insert(&mut self, entry: SourceEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.display_name == entry.display_name)
        {
            Some(existing) => existing.detail_url = entry.detail_url,
            None => self.entries.push(entry),
        }
    }

    /// Look up an entry by its display name.
    pub fn get(&self, display_name: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.display_name == display_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.display_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SourceEntry> for SourceList {
    fn from_iter<I: IntoIterator<Item = SourceEntry>>(iter: I) -> Self {
        let mut list = SourceList::default();
        for entry in iter {
            list.insert(entry);
        }
        list
    }
}

/// Which family of detail pages a catalog section points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Weekly class schedules.
    Schedule,
    /// Lesson-accounting (planned vs. delivered hours) records.
    Records,
}

/// Every selectable source, per section and kind.
///
/// A catalog is built in one piece and then published; it is never
/// updated incrementally. A kind whose index page could not be fetched is
/// present with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCatalog {
    pub schedules: BTreeMap<SourceKind, SourceList>,
    pub records: BTreeMap<SourceKind, SourceList>,
}

impl LinkCatalog {
    /// Sources of one kind within a section, if that kind was indexed.
    pub fn sources(&self, section: Section, kind: SourceKind) -> Option<&SourceList> {
        match section {
            Section::Schedule => self.schedules.get(&kind),
            Section::Records => self.records.get(&kind),
        }
    }

    /// Resolve a display name to its entry.
    pub fn lookup(&self, section: Section, kind: SourceKind, name: &str) -> Option<&SourceEntry> {
        self.sources(section, kind).and_then(|list| list.get(name))
    }

    pub(crate) fn section_mut(&mut self, section: Section) -> &mut BTreeMap<SourceKind, SourceList> {
        match section {
            Section::Schedule => &mut self.schedules,
            Section::Records => &mut self.records,
        }
    }
}

/// The lesson slot number printed in the first cell of a lesson row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordinal {
    /// A numbered slot (1-based).
    Slot(u32),
    /// The cell did not start with a positive digit.
    Unscheduled,
}

impl Ordinal {
    /// Read the ordinal from a cell's text. Only the first character counts.
    pub fn from_cell(text: &str) -> Self {
        match text.trim_start().chars().next().and_then(|c| c.to_digit(10)) {
            Some(n) if n > 0 => Ordinal::Slot(n),
            _ => Ordinal::Unscheduled,
        }
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ordinal::Slot(n) => write!(f, "{}", n),
            Ordinal::Unscheduled => f.write_str("-"),
        }
    }
}

/// One subgroup's assignment in one lesson slot.
///
/// Which of `room`, `lecturer` and `group` are filled depends on the kind
/// of page the lesson came from: a group page names the lecturer, a
/// lecturer page names the group, a room page names both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub ordinal: Ordinal,
    /// Bell time range for the slot, empty when the slot has no configured time.
    pub bells: String,
    /// 0 when the slot is not split, otherwise the 1-based subgroup.
    pub subgroup: u8,
    pub name: String,
    /// `None` means no room was published (remote lesson).
    pub room: Option<String>,
    pub lecturer: Option<String>,
    pub group: Option<String>,
}

/// A calendar day and its lessons, in table row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    /// Date exactly as published (e.g. `"02.09.2024"`).
    pub date: String,
    /// Abbreviated weekday token from the page (e.g. `"Пн"`).
    pub weekday_token: String,
    /// Full weekday name, `None` when the token is not one of the seven known ones.
    pub weekday: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Day {
    /// Display name of the weekday, falling back to the raw token.
    pub fn weekday_label(&self) -> &str {
        self.weekday.as_deref().unwrap_or(&self.weekday_token)
    }
}

/// The source kind advertised in a page title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceLabel {
    Known(SourceKind),
    /// The title label did not match any configured kind; kept verbatim.
    Unrecognized(String),
}

impl SourceLabel {
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            SourceLabel::Known(kind) => Some(*kind),
            SourceLabel::Unrecognized(_) => None,
        }
    }
}

/// When the site says the page was last regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastModified {
    /// Unix timestamp in seconds.
    At(i64),
    Unknown,
}

/// A parsed schedule page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub source_kind: SourceLabel,
    /// Empty when the page title did not look like `"<label>: <name>"`.
    pub source_name: String,
    pub last_modified: LastModified,
    /// Days in published order.
    pub days: Vec<Day>,
}

impl Schedule {
    /// Total number of lessons over all days.
    pub fn lesson_count(&self) -> usize {
        self.days.iter().map(|d| d.lessons.len()).sum()
    }
}

/// Semester totals of a lesson-accounting record, in academic hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemesterHours {
    pub total: Option<f64>,
    pub planned: Option<f64>,
    pub actual: Option<f64>,
    pub remaining: Option<f64>,
}

/// Weekly load of a lesson-accounting record, in academic hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekHours {
    pub planned: Option<f64>,
    pub actual: Option<f64>,
}

/// One row of a lesson-accounting page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub number: Option<u32>,
    pub lecturer: String,
    pub group: String,
    /// 0 when the record is not split by subgroup.
    pub subgroup: u8,
    pub name: String,
    pub lesson_type: String,
    pub semester: SemesterHours,
    pub week: WeekHours,
    pub end_date: String,
    /// Completion percentage taken from the progress bar image.
    pub progress: Option<f64>,
}

/// A parsed lesson-accounting page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsPage {
    pub source_kind: SourceLabel,
    pub source_name: String,
    pub last_modified: LastModified,
    pub records: Vec<Record>,
}

/// Outcome of timing one request to the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// HTTP status code, or -1 when the request never got a response.
    pub status: i32,
    /// Status reason phrase, or the transport error description.
    pub message: String,
    pub elapsed_ms: u64,
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        self.status >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, url: &str) -> SourceEntry {
        SourceEntry {
            display_name: name.to_string(),
            detail_url: url.to_string(),
        }
    }

    #[test]
    fn test_source_list_last_write_wins_keeps_position() {
        let list: SourceList = vec![
            entry("ИС-21", "http://x/1.htm"),
            entry("ИС-22", "http://x/2.htm"),
            entry("ИС-21", "http://x/3.htm"),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.len(), 2);
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["ИС-21", "ИС-22"]);
        assert_eq!(list.get("ИС-21").unwrap().detail_url, "http://x/3.htm");
    }

    #[test]
    fn test_ordinal_from_cell() {
        assert_eq!(Ordinal::from_cell("3"), Ordinal::Slot(3));
        assert_eq!(Ordinal::from_cell("4 пара"), Ordinal::Slot(4));
        assert_eq!(Ordinal::from_cell(" 2"), Ordinal::Slot(2));
        assert_eq!(Ordinal::from_cell("0"), Ordinal::Unscheduled);
        assert_eq!(Ordinal::from_cell("-"), Ordinal::Unscheduled);
        assert_eq!(Ordinal::from_cell(""), Ordinal::Unscheduled);
        assert_eq!(Ordinal::Unscheduled.to_string(), "-");
        assert_eq!(Ordinal::Slot(7).to_string(), "7");
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = LinkCatalog::default();
        catalog.schedules.insert(
            SourceKind::Room,
            vec![entry("101", "http://x/a101.htm")].into_iter().collect(),
        );

        assert!(catalog.lookup(Section::Schedule, SourceKind::Room, "101").is_some());
        assert!(catalog.lookup(Section::Schedule, SourceKind::Room, "102").is_none());
        assert!(catalog.lookup(Section::Records, SourceKind::Room, "101").is_none());
    }

    #[test]
    fn test_day_weekday_label_falls_back_to_token() {
        let day = Day {
            date: "01.09.2024".to_string(),
            weekday_token: "Xx".to_string(),
            weekday: None,
            lessons: vec![],
        };
        assert_eq!(day.weekday_label(), "Xx");
    }

    #[test]
    fn test_schedule_serialization() {
        let schedule = Schedule {
            source_kind: SourceLabel::Known(SourceKind::Group),
            source_name: "ИС-21".to_string(),
            last_modified: LastModified::Unknown,
            days: vec![],
        };

        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"source_kind\":\"group\""));
        assert!(json.contains("\"last_modified\":null"));
    }

    #[test]
    fn test_probe_result_reachable() {
        let ok = ProbeResult {
            status: 200,
            message: "OK".to_string(),
            elapsed_ms: 12,
        };
        let failed = ProbeResult {
            status: -1,
            message: "connection refused".to_string(),
            elapsed_ms: 0,
        };
        assert!(ok.is_reachable());
        assert!(!failed.is_reachable());
    }
}
