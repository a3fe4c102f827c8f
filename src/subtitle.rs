use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::error::{Result, SubtransError};

/// One SRT block. Only `content` changes during translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: u32,
    pub start: Duration,
    pub end: Duration,
    pub content: String,
}

impl SubtitleEntry {
    pub fn new(index: u32, start: Duration, end: Duration, content: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            content: content.into(),
        }
    }

    /// Copy of this entry carrying different text
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

/// Read and parse an SRT file
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SubtransError::FileNotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).await?;
    let entries = parse_srt(&content)?;
    info!("Loaded {} subtitle entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Write entries to `path`. The file appears only once fully written.
pub async fn write_srt<P: AsRef<Path>>(entries: &[SubtitleEntry], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut staging = path.as_os_str().to_owned();
    staging.push(".part");

    let staged = match fs::write(&staging, compose_srt(entries)).await {
        Ok(()) => fs::rename(&staging, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = staged {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }

    info!("Wrote {} subtitle entries to {}", entries.len(), path.display());
    Ok(())
}

/// Parse SRT text. A leading BOM and CRLF line endings are accepted.
pub fn parse_srt(input: &str) -> Result<Vec<SubtitleEntry>> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut entries = Vec::new();
    let mut lines = input.lines().enumerate().peekable();

    loop {
        // Skip blank separators
        while lines.next_if(|(_, l)| l.trim().is_empty()).is_some() {}

        let Some((index_no, index_line)) = lines.next() else {
            break;
        };
        let index: u32 = index_line.trim().parse().map_err(|_| SubtransError::Parse {
            line: index_no + 1,
            message: format!("expected a subtitle index, found '{}'", index_line.trim()),
        })?;

        let (time_no, time_line) = lines.next().ok_or_else(|| SubtransError::Parse {
            line: index_no + 2,
            message: "missing time range".to_string(),
        })?;
        let (start, end) = parse_time_range(time_line).ok_or_else(|| SubtransError::Parse {
            line: time_no + 1,
            message: format!("invalid time range '{}'", time_line.trim()),
        })?;
        if start > end {
            return Err(SubtransError::Parse {
                line: time_no + 1,
                message: "start time is after end time".to_string(),
            });
        }

        let mut text = Vec::new();
        while let Some((_, line)) = lines.next_if(|(_, l)| !l.trim().is_empty()) {
            text.push(line.trim_end());
        }

        entries.push(SubtitleEntry::new(index, start, end, text.join("\n")));
    }

    Ok(entries)
}

/// Serialize entries back to SRT text
pub fn compose_srt(entries: &[SubtitleEntry]) -> String {
    let mut srt_content = String::new();

    for entry in entries {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index,
            format_srt_time(entry.start),
            format_srt_time(entry.end),
            entry.content
        ));
    }

    srt_content
}

fn parse_time_range(line: &str) -> Option<(Duration, Duration)> {
    let (start, end) = line.split_once("-->")?;
    Some((parse_srt_time(start.trim())?, parse_srt_time(end.trim())?))
}

/// Parse `HH:MM:SS,mmm` (a `.` separator is tolerated)
fn parse_srt_time(value: &str) -> Option<Duration> {
    let (clock, millis) = value.split_once([',', '.'])?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 || millis.len() != 3 {
        return None;
    }
    let millis: u64 = millis.parse().ok()?;

    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

/// Format a time offset in SRT time format (HH:MM:SS,mmm)
fn format_srt_time(offset: Duration) -> String {
    let total_milliseconds = offset.as_millis() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
