use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Utc};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    error::ReportError,
    model::{ForecastRequest, WeatherReport},
};

pub const DEFAULT_OUTPUT_ROOT: &str = "results";

/// `<root>/<YYYY>/<MM>/<DD>/<lat>_<lon>_<days>_<YYYYMMDD_HHMM>UTC.txt`, all in UTC.
///
/// `<days>` is 0 when only current weather was requested. Two runs with the
/// same inputs inside the same minute resolve to the same path.
pub fn report_path(root: &Path, request: &ForecastRequest, now: DateTime<Utc>) -> PathBuf {
    let days = request.forecast_days.map_or(0, |d| d.get());
    let file_name = format!(
        "{}_{}_{}_{}.txt",
        request.coordinate.latitude(),
        request.coordinate.longitude(),
        days,
        now.format("%Y%m%d_%H%MUTC"),
    );

    root.join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()))
        .join(format!("{:02}", now.day()))
        .join(file_name)
}

/// Writes the whole report to a temporary file beside `path` and persists it
/// over `path`. The temporary file is removed on drop if any step fails, so a
/// failed write never leaves a truncated report or a stray temp file behind.
pub fn write_report(path: &Path, report: &WeatherReport) -> Result<(), ReportError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ReportError::io(parent, e))?;
    tmp.write_all(report.to_text().as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ReportError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ReportError::io(path, e.error))?;

    info!("Wrote {} report line(s) to {}", report.len(), path.display());
    Ok(())
}
