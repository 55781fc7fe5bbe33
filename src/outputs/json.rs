//! JSON export of parsed schedules.
//!
//! Writes a [`Schedule`] exactly as parsed, for consumers that want the
//! structured data rather than the chat message, and for capturing test
//! fixtures.

use crate::models::Schedule;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`Schedule`] to `path` as pretty-printed JSON.
///
/// Missing parent directories are created.
///
/// # Arguments
///
/// * `schedule` - The parsed schedule to serialize
/// * `path` - Destination file
///
/// # Returns
///
/// `Ok(())` on success, or an error if directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_schedule(schedule: &Schedule, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(schedule)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(
        source = %schedule.source_name,
        days = schedule.days.len(),
        lessons = schedule.lesson_count(),
        "Wrote schedule JSON"
    );
    Ok(())
}
