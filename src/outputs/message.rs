//! Chat message rendering.
//!
//! Turns parsed pages into the text the chat layer sends. Rendering is
//! done in two steps: the `format_*` functions build the message with its
//! markup (`*bold*`, `_italic_`, `__underline__`), then the `render_*`
//! functions apply the blanket escape from [`crate::utils::escape_markdown`]
//! to the whole text. The escape is invertible, so
//! `unescape_markdown(render_x(..)) == format_x(..)`.
//!
//! The delivery layer enforces its own message length ceiling; nothing
//! here splits or caps a whole message.
//!
//! # Schedule Layout
//!
//! ```text
//! Расписание группы *ИС-21*
//! --------------------------
//!
//! 02.09.2024 - *Понедельник*
//!
//! __1 пара__ - _08:30-10:00_ - Математика - _301_
//!
//! --------------------------
//! _Обновлено: 02.09.24 в 14:30_
//! ```

use crate::config::AppConfig;
use crate::models::{Day, LastModified, Lesson, ProbeResult, Record, RecordsPage, Schedule, SourceKind};
use crate::utils::{escape_markdown, truncate};
use chrono::{DateTime, FixedOffset};

/// Shown in place of a room when none was published.
pub const REMOTE_ROOM_LABEL: &str = "Дистант";

/// Placeholder for an unknown kind, source name or modification time.
pub const UNKNOWN_PLACEHOLDER: &str = "...";

pub const SEPARATOR: &str = "--------------------------";

pub const INVALID_SOURCE_MESSAGE: &str =
    "Указан неверный источник расписания! (возможно он устарел)\nИспользуйте /settings и обновите его!";

pub const UNAVAILABLE_MESSAGE: &str = "Не удалось получить данные расписания, попробуйте позже!";

pub const INVALID_RECORDS_SOURCE_MESSAGE: &str = "Указан неверный источник учёта!";

pub const RECORDS_UNAVAILABLE_MESSAGE: &str =
    "Не удалось получить данные учёта занятий, попробуйте позже!";

/// How a schedule is laid out.
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    /// Lesson name cap in characters; `<= 0` disables it.
    pub max_name_length: i32,
    /// Skip weekend days that have no lessons.
    pub exclude_empty_weekends: bool,
    /// Skip any day that has no lessons.
    pub exclude_empty_days: bool,
    /// Full weekday names counted as weekend.
    pub weekend_names: &'a [String],
    /// Zone modification times are shown in.
    pub utc_offset: FixedOffset,
}

impl<'a> RenderOptions<'a> {
    pub fn from_config(config: &'a AppConfig) -> Self {
        Self {
            max_name_length: config.render.truncate,
            exclude_empty_weekends: config.render.exclude_empty_weekends,
            exclude_empty_days: config.render.exclude_empty_days,
            weekend_names: &config.render.weekend_names,
            utc_offset: config.utc_offset(),
        }
    }

    pub fn with_max_name_length(mut self, max_name_length: i32) -> Self {
        self.max_name_length = max_name_length;
        self
    }

    fn skips(&self, day: &Day) -> bool {
        if !day.lessons.is_empty() {
            return false;
        }
        self.exclude_empty_days
            || (self.exclude_empty_weekends
                && self.weekend_names.iter().any(|w| w == day.weekday_label()))
    }
}

fn subgroup_suffix(subgroup: u8) -> String {
    if subgroup == 0 {
        String::new()
    } else {
        format!(" ({})", subgroup)
    }
}

/// Format one lesson line with the template of the page's kind.
///
/// * group: `__{n} пара__ - _{bells}_ - {name} - _{room}_`
/// * lecturer: `__{n} пара__ - _{bells}_ - *{group}* - {name} - _{room}_`
/// * room: `__{n} пара__ - _{bells}_ - *{lecturer}* - {group} - _{name}_`
///
/// Pages of an unrecognized kind get the ordinal, bells and name only.
pub fn format_lesson(kind: Option<SourceKind>, lesson: &Lesson, max_name_length: i32) -> String {
    let head = format!("__{} пара__ - _{}_", lesson.ordinal, lesson.bells);
    let name = format!(
        "{}{}",
        truncate(&lesson.name, max_name_length),
        subgroup_suffix(lesson.subgroup)
    );
    let room = lesson.room.as_deref().unwrap_or(REMOTE_ROOM_LABEL);
    let group = lesson.group.as_deref().unwrap_or_default();
    let lecturer = lesson.lecturer.as_deref().unwrap_or_default();

    match kind {
        Some(SourceKind::Group) => format!("{} - {} - _{}_", head, name, room),
        Some(SourceKind::Lecturer) => format!("{} - *{}* - {} - _{}_", head, group, name, room),
        Some(SourceKind::Room) => format!("{} - *{}* - {} - _{}_", head, lecturer, group, name),
        None => format!("{} - {}", head, name),
    }
}

/// The trailing "updated at" line.
pub fn format_last_modified(last_modified: LastModified, offset: FixedOffset) -> String {
    let at = match last_modified {
        LastModified::At(ts) => DateTime::from_timestamp(ts, 0),
        LastModified::Unknown => None,
    };
    match at {
        Some(at) => at
            .with_timezone(&offset)
            .format("_Обновлено: %d.%m.%y в %H:%M_")
            .to_string(),
        None => format!("_Обновлено: {}_", UNKNOWN_PLACEHOLDER),
    }
}

fn format_header(title: &str, kind: Option<SourceKind>, name: &str) -> String {
    format!(
        "{} {} *{}*\n{}\n",
        title,
        kind.map_or(UNKNOWN_PLACEHOLDER, |k| k.genitive()),
        name,
        SEPARATOR
    )
}

/// Build the unescaped schedule message.
pub fn format_schedule(schedule: &Schedule, options: &RenderOptions<'_>) -> String {
    let kind = schedule.source_kind.kind();
    let mut msg = format_header("Расписание", kind, &schedule.source_name);

    for day in schedule.days.iter().filter(|d| !options.skips(d)) {
        msg.push_str(&format!("\n{} - *{}*\n\n", day.date, day.weekday_label()));
        for lesson in &day.lessons {
            msg.push_str(&format_lesson(kind, lesson, options.max_name_length));
            msg.push('\n');
        }
        msg.push_str(&format!("\n{}\n", SEPARATOR));
    }

    msg.push_str(&format_last_modified(schedule.last_modified, options.utc_offset));
    msg
}

/// Build the schedule message and escape it for delivery.
pub fn render_schedule(schedule: &Schedule, options: &RenderOptions<'_>) -> String {
    escape_markdown(&format_schedule(schedule, options))
}

fn hours(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn format_record(kind: Option<SourceKind>, record: &Record, max_name_length: i32) -> String {
    let number = record.number.map_or_else(|| "-".to_string(), |n| n.to_string());
    let counterpart = match kind {
        Some(SourceKind::Group) => record.lecturer.clone(),
        Some(SourceKind::Lecturer) => record.group.clone(),
        _ => format!("{}, {}", record.group, record.lecturer),
    };
    let end_date = if record.end_date.is_empty() {
        "-"
    } else {
        record.end_date.as_str()
    };

    format!(
        "{}. *{}*{} - _{}_\n{}\nЧасы: {} из {} (план {}, осталось {})\nВ неделю: {} из {}\nВыполнено: {}%, окончание: {}\n",
        number,
        truncate(&record.name, max_name_length),
        subgroup_suffix(record.subgroup),
        record.lesson_type,
        counterpart,
        hours(record.semester.actual),
        hours(record.semester.total),
        hours(record.semester.planned),
        hours(record.semester.remaining),
        hours(record.week.actual),
        hours(record.week.planned),
        hours(record.progress),
        end_date,
    )
}

/// Build the unescaped lesson-accounting message, one block per record.
pub fn format_records(page: &RecordsPage, options: &RenderOptions<'_>) -> String {
    let kind = page.source_kind.kind();
    let mut msg = format_header("Учёт занятий", kind, &page.source_name);
    for record in &page.records {
        msg.push('\n');
        msg.push_str(&format_record(kind, record, options.max_name_length));
    }
    msg.push_str(&format!("\n{}\n", SEPARATOR));
    msg.push_str(&format_last_modified(page.last_modified, options.utc_offset));
    msg
}

/// Build the lesson-accounting message and escape it for delivery.
pub fn render_records(page: &RecordsPage, options: &RenderOptions<'_>) -> String {
    escape_markdown(&format_records(page, options))
}

/// Escaped site status message.
pub fn status_message(probe: &ProbeResult) -> String {
    let text = if probe.is_reachable() {
        format!("Статус: *{}*\nОтклик: *{} мс.*", probe.status, probe.elapsed_ms)
    } else {
        format!(
            "*Не удаётся установить соединение с сайтом!*\n\nТекст ошибки:\n_{}_",
            probe.message
        )
    };
    escape_markdown(&text)
}

pub fn invalid_source_message() -> String {
    escape_markdown(INVALID_SOURCE_MESSAGE)
}

pub fn unavailable_message() -> String {
    escape_markdown(UNAVAILABLE_MESSAGE)
}

pub fn invalid_records_source_message() -> String {
    escape_markdown(INVALID_RECORDS_SOURCE_MESSAGE)
}

pub fn records_unavailable_message() -> String {
    escape_markdown(RECORDS_UNAVAILABLE_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ordinal, SemesterHours, SourceLabel, WeekHours};
    use crate::utils::unescape_markdown;
    use chrono::TimeZone;

    fn lesson(ordinal: u32, name: &str, subgroup: u8, room: Option<&str>) -> Lesson {
        Lesson {
            ordinal: Ordinal::Slot(ordinal),
            bells: "08:30-10:00".to_string(),
            subgroup,
            name: name.to_string(),
            room: room.map(str::to_string),
            lecturer: Some("Иванов И.И.".to_string()),
            group: Some("ИС-21".to_string()),
        }
    }

    fn day(date: &str, token: &str, weekday: &str, lessons: Vec<Lesson>) -> Day {
        Day {
            date: date.to_string(),
            weekday_token: token.to_string(),
            weekday: Some(weekday.to_string()),
            lessons,
        }
    }

    fn schedule(kind: SourceKind, days: Vec<Day>) -> Schedule {
        Schedule {
            source_kind: SourceLabel::Known(kind),
            source_name: "ИС-21".to_string(),
            last_modified: LastModified::Unknown,
            days,
        }
    }

    fn week() -> Vec<Day> {
        vec![
            day("06.09.2024", "Пт", "Пятница", vec![lesson(1, "Математика", 0, Some("301"))]),
            day("07.09.2024", "Сб", "Суббота", vec![]),
            day("08.09.2024", "Вс", "Воскресенье", vec![lesson(2, "Физика", 0, Some("12"))]),
            day("09.09.2024", "Пн", "Понедельник", vec![]),
        ]
    }

    fn options(config: &AppConfig) -> RenderOptions<'_> {
        RenderOptions::from_config(config)
    }

    #[test]
    fn test_format_schedule_layout() {
        let config = AppConfig::default();
        let s = schedule(
            SourceKind::Group,
            vec![day("02.09.2024", "Пн", "Понедельник", vec![lesson(1, "Математика", 0, Some("301"))])],
        );
        let expected = "Расписание группы *ИС-21*\n--------------------------\n\
\n02.09.2024 - *Понедельник*\n\n\
__1 пара__ - _08:30-10:00_ - Математика - _301_\n\
\n--------------------------\n\
_Обновлено: ..._";
        assert_eq!(format_schedule(&s, &options(&config)), expected);
    }

    #[test]
    fn test_empty_weekend_suppressed_but_busy_weekend_kept() {
        let config = AppConfig::default();
        let text = format_schedule(&schedule(SourceKind::Group, week()), &options(&config));

        assert!(!text.contains("Суббота"));
        assert!(text.contains("*Воскресенье*"));
        assert!(text.contains("*Понедельник*"));
    }

    #[test]
    fn test_empty_days_suppressed() {
        let mut config = AppConfig::default();
        config.render.exclude_empty_weekends = false;
        config.render.exclude_empty_days = true;
        let text = format_schedule(&schedule(SourceKind::Group, week()), &options(&config));

        assert!(!text.contains("Суббота"));
        assert!(!text.contains("Понедельник"));
        assert!(text.contains("Пятница"));
    }

    #[test]
    fn test_no_suppression() {
        let mut config = AppConfig::default();
        config.render.exclude_empty_weekends = false;
        let text = format_schedule(&schedule(SourceKind::Group, week()), &options(&config));
        assert!(text.contains("Суббота"));
        assert_eq!(text.matches(SEPARATOR).count(), 5);
    }

    #[test]
    fn test_missing_room_renders_remote_label() {
        let line = format_lesson(Some(SourceKind::Group), &lesson(3, "Физика", 0, None), 80);
        assert_eq!(line, "__3 пара__ - _08:30-10:00_ - Физика - _Дистант_");
    }

    #[test]
    fn test_format_lesson_per_kind() {
        let l = lesson(2, "Математика", 1, Some("301"));
        assert_eq!(
            format_lesson(Some(SourceKind::Lecturer), &l, 80),
            "__2 пара__ - _08:30-10:00_ - *ИС-21* - Математика (1) - _301_"
        );
        assert_eq!(
            format_lesson(Some(SourceKind::Room), &l, 80),
            "__2 пара__ - _08:30-10:00_ - *Иванов И.И.* - ИС-21 - _Математика (1)_"
        );
        assert_eq!(
            format_lesson(None, &l, 80),
            "__2 пара__ - _08:30-10:00_ - Математика (1)"
        );
    }

    #[test]
    fn test_format_lesson_unscheduled_and_truncated() {
        let mut l = lesson(1, "Информационные технологии", 0, Some("301"));
        l.ordinal = Ordinal::Unscheduled;
        l.bells = String::new();
        assert_eq!(
            format_lesson(Some(SourceKind::Group), &l, 10),
            "__- пара__ - __ - Информа... - _301_"
        );
    }

    #[test]
    fn test_render_schedule_escape_round_trip() {
        let config = AppConfig::default();
        let s = schedule(SourceKind::Room, week());
        let opts = options(&config);
        let formatted = format_schedule(&s, &opts);
        let rendered = render_schedule(&s, &opts);

        assert_ne!(formatted, rendered);
        assert!(rendered.contains("\\-\\-\\-"));
        assert_eq!(unescape_markdown(&rendered), formatted);
    }

    #[test]
    fn test_format_last_modified() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2024, 9, 2, 14, 30, 0).unwrap().timestamp();

        assert_eq!(
            format_last_modified(LastModified::At(ts), offset),
            "_Обновлено: 02.09.24 в 14:30_"
        );
        assert_eq!(
            format_last_modified(LastModified::Unknown, offset),
            "_Обновлено: ..._"
        );
    }

    #[test]
    fn test_unrecognized_kind_header() {
        let config = AppConfig::default();
        let mut s = schedule(SourceKind::Group, vec![]);
        s.source_kind = SourceLabel::Unrecognized("Кафедра".to_string());
        let text = format_schedule(&s, &options(&config));
        assert!(text.starts_with("Расписание ... *ИС-21*"));
    }

    #[test]
    fn test_render_records() {
        let config = AppConfig::default();
        let page = RecordsPage {
            source_kind: SourceLabel::Known(SourceKind::Group),
            source_name: "ИС-21".to_string(),
            last_modified: LastModified::Unknown,
            records: vec![Record {
                number: Some(1),
                lecturer: "Иванов И.И.".to_string(),
                group: "ИС-21".to_string(),
                subgroup: 2,
                name: "Математика".to_string(),
                lesson_type: "Лекция".to_string(),
                semester: SemesterHours {
                    total: Some(72.0),
                    planned: Some(36.5),
                    actual: Some(34.0),
                    remaining: None,
                },
                week: WeekHours {
                    planned: Some(4.0),
                    actual: Some(3.5),
                },
                end_date: String::new(),
                progress: Some(47.2),
            }],
        };

        let opts = options(&config);
        let formatted = format_records(&page, &opts);
        assert!(formatted.starts_with("Учёт занятий группы *ИС-21*"));
        assert!(formatted.contains("1. *Математика* (2) - _Лекция_\nИванов И.И.\n"));
        assert!(formatted.contains("Часы: 34 из 72 (план 36.5, осталось -)"));
        assert!(formatted.contains("В неделю: 3.5 из 4"));
        assert!(formatted.contains("Выполнено: 47.2%, окончание: -"));
        assert_eq!(unescape_markdown(&render_records(&page, &opts)), formatted);
    }

    #[test]
    fn test_status_message() {
        let ok = ProbeResult {
            status: 200,
            message: "OK".to_string(),
            elapsed_ms: 87,
        };
        assert_eq!(status_message(&ok), "Статус: *200*\nОтклик: *87 мс\\.*");

        let failed = ProbeResult {
            status: -1,
            message: "connection refused".to_string(),
            elapsed_ms: 3,
        };
        assert_eq!(
            status_message(&failed),
            "*Не удаётся установить соединение с сайтом\\!*\n\nТекст ошибки:\n_connection refused_"
        );
    }

    #[test]
    fn test_fixed_messages_are_escaped() {
        assert_eq!(
            unavailable_message(),
            "Не удалось получить данные расписания, попробуйте позже\\!"
        );
        assert!(invalid_source_message().contains("\\(возможно он устарел\\)"));
        assert!(invalid_records_source_message().ends_with("учёта\\!"));
        assert!(records_unavailable_message().ends_with("позже\\!"));
    }
}
