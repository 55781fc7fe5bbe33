//! Lesson slot number to bell time resolution.
//!
//! The first weekday of the week runs on a different bell schedule (its
//! first slot is split around a long break), so two independent tables are
//! configured and the table is chosen by the weekday token of the day the
//! lesson belongs to.

use crate::models::Ordinal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bell tables for ordinary days and for the distinguished first weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BellsConfig {
    /// Slot number → time range on every day except the first weekday.
    pub regular: BTreeMap<u32, String>,
    /// Slot number → time range on the first weekday.
    pub first_weekday: BTreeMap<u32, String>,
    /// Weekday token (as published in day headers) that selects `first_weekday`.
    pub first_weekday_token: String,
}

impl Default for BellsConfig {
    fn default() -> Self {
        let table = |slots: [&str; 7]| {
            slots
                .iter()
                .enumerate()
                .map(|(i, s)| (i as u32 + 1, s.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            regular: table([
                "8:30-10:00",
                "10:10-11:40",
                "12:10-13:40",
                "13:50-15:20",
                "15:30-17:00",
                "17:10-18:40",
                "18:50-20:20",
            ]),
            first_weekday: table([
                "8:30-9:00 / 15:20-15:50",
                "9:10-10:30",
                "10:40-12:00",
                "12:20-13:40",
                "13:50-15:10",
                "16:00-17:20",
                "17:30-18:50",
            ]),
            first_weekday_token: "Пн".to_string(),
        }
    }
}

impl BellsConfig {
    /// Bell time for a slot on the day identified by `weekday_token`.
    ///
    /// Returns an empty string for unscheduled lessons and for slots the
    /// table does not list.
    pub fn resolve(&self, ordinal: Ordinal, weekday_token: &str) -> &str {
        let Ordinal::Slot(n) = ordinal else {
            return "";
        };
        let table = if weekday_token == self.first_weekday_token {
            &self.first_weekday
        } else {
            &self.regular
        };
        table.get(&n).map(String::as_str).unwrap_or("")
    }
}
