//! Upload audit log for artifact publish attempts.
//!
//! Stores append-only JSONL events at:
//! `~/.chartify-make/uploads.jsonl`

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const LOG_FILE_NAME: &str = "uploads.jsonl";
const STATE_DIR_NAME: &str = ".chartify-make";

/// One recorded upload attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub id: String,
    pub time: i64,
    pub binary: String,
    pub file: String,
    pub version: String,
    pub bucket: String,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub uploads_last_7d: usize,
    pub last: Option<UploadEvent>,
}

/// Resolve the user's home directory.
///
/// Uses the `HOME` environment variable, which works on Unix/macOS.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

fn state_dir_in(home: &Path) -> Result<PathBuf> {
    let dir = home.join(STATE_DIR_NAME);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

fn log_path_in(home: &Path) -> Result<PathBuf> {
    Ok(state_dir_in(home)?.join(LOG_FILE_NAME))
}

fn log_path() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home dir"))?;
    log_path_in(&home)
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn make_event_id(time: i64, binary: &str, file: &str, status: &str, error: Option<&str>) -> String {
    let seed = format!(
        "{}|{}|{}|{}|{}",
        time,
        binary,
        file,
        status,
        error.unwrap_or("")
    );
    let hash = Sha256::digest(seed.as_bytes());
    format!("{:x}", hash)[..12].to_string()
}

fn append_event_to(path: &Path, event: &UploadEvent) -> Result<()> {
    let line = serde_json::to_string(event)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

fn read_events_from(path: &Path) -> Result<Vec<UploadEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut events = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => continue,
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<UploadEvent>(&line) {
            events.push(event);
        }
    }

    Ok(events)
}

/// Record one upload attempt, successful or not.
pub fn record_upload(
    binary: &str,
    file: &str,
    version: &str,
    bucket: &str,
    success: bool,
    error: Option<&str>,
) -> Result<()> {
    let time = now_unix();
    let status = if success { "success" } else { "failed" };
    let event = UploadEvent {
        id: make_event_id(time, binary, file, status, error),
        time,
        binary: binary.to_string(),
        file: file.to_string(),
        version: version.to_string(),
        bucket: bucket.to_string(),
        status: status.to_string(),
        error: error.map(ToString::to_string),
    };

    let path = log_path()?;
    append_event_to(&path, &event)
}

/// All recorded events, newest first, optionally limited to a time window.
pub fn list_events(since_secs: Option<i64>) -> Result<Vec<UploadEvent>> {
    let path = log_path()?;
    let mut events = read_events_from(&path)?;
    if let Some(window) = since_secs {
        let cutoff = now_unix() - window;
        events.retain(|e| e.time >= cutoff);
    }
    events.sort_by(|a, b| b.time.cmp(&a.time));
    Ok(events)
}

pub fn summary_last_7d() -> Result<UploadSummary> {
    let events = list_events(Some(7 * 86_400))?;
    let last = events.first().cloned();
    Ok(UploadSummary {
        uploads_last_7d: events.len(),
        last,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn sample_event() -> UploadEvent {
        UploadEvent {
            id: "abc123".to_string(),
            time: 1_700_000_000,
            binary: "chartify".to_string(),
            file: "chartify-linux-amd64".to_string(),
            version: "1.2.3".to_string(),
            bucket: "gs://appscode-dev".to_string(),
            status: "success".to_string(),
            error: None,
        }
    }

    #[test]
    fn test_append_and_read_events() {
        let home = TempDir::new().unwrap();
        let path = log_path_in(home.path()).unwrap();

        append_event_to(&path, &sample_event()).unwrap();
        let events = read_events_from(&path).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "abc123");
        assert_eq!(events[0].binary, "chartify");
    }

    #[test]
    fn test_read_events_skips_invalid_lines() {
        let home = TempDir::new().unwrap();
        let path = log_path_in(home.path()).unwrap();
        std::fs::write(
            &path,
            "{\"id\":\"ok\",\"time\":1,\"binary\":\"chartify\",\"file\":\"f\",\"version\":\"1.0.0\",\"bucket\":\"gs://b\",\"status\":\"success\",\"error\":null}\nnot-json\n",
        )
        .unwrap();

        let events = read_events_from(&path).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ok");
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("no-such-dir").join(LOG_FILE_NAME);
        let events = read_events_from(&path).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    #[serial]
    fn test_summary_counts_recent_uploads_and_keeps_last() {
        let home = TempDir::new().unwrap();
        let original = std::env::var("HOME").ok();
        unsafe { std::env::set_var("HOME", home.path()) };

        record_upload(
            "chartify",
            "chartify-linux-amd64",
            "1.2.3",
            "gs://appscode-dev",
            true,
            None,
        )
        .unwrap();
        record_upload(
            "chartify",
            "chartify-windows-amd64.exe",
            "1.2.3",
            "gs://appscode-dev",
            false,
            Some("boom"),
        )
        .unwrap();
        let summary = summary_last_7d();

        unsafe {
            match original {
                Some(h) => std::env::set_var("HOME", h),
                None => std::env::remove_var("HOME"),
            }
        }

        let summary = summary.unwrap();
        assert_eq!(summary.uploads_last_7d, 2);
        let last = summary.last.expect("a most recent event");
        assert_eq!(last.binary, "chartify");
        assert_eq!(last.version, "1.2.3");
    }

    #[test]
    fn test_event_id_is_stable_and_short() {
        let a = make_event_id(1, "chartify", "f", "success", None);
        let b = make_event_id(1, "chartify", "f", "success", None);
        let c = make_event_id(1, "chartify", "f", "failed", Some("boom"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }
}
