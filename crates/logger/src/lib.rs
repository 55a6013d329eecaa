//! Extra Innings Live — Logger
//!
//! Append-only JSONL audit stream, one file per UTC day. Write-only: nothing
//! in the notifier reads these files back.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create event log dir {}: {}", dir.display(), e);
        }
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Same as [`log`](Self::log) but a failed write only produces a warning.
    pub fn log_or_warn<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            tracing::warn!("Event log write failed: {e}");
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ExtraInningsEvent {
    pub ts:       String,
    pub event:    &'static str,   // "EXTRA_INNINGS"
    pub game_pk:  u64,
    pub home:     String,
    pub away:     String,
    pub inning:   u32,
    pub half:     String,
    pub delivery: String,         // "delivered" | "rejected_<status>" | "transport_failed"
}

#[derive(Serialize, Debug)]
pub struct CycleHeartbeatEvent {
    pub ts:                 String,
    pub event:              &'static str,   // "CYCLE_HEARTBEAT"
    pub ok:                 bool,
    pub games_seen:         usize,
    pub feeds_fetched:      usize,
    pub notified:           usize,
    pub delivery_failures:  usize,
    pub tracked_games:      usize,
    pub error:              Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("extra_innings_logger_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn appends_one_line_per_event() {
        let dir = scratch_dir("append");
        let logger = EventLogger::new(&dir);

        for ok in [true, false] {
            logger.log(&CycleHeartbeatEvent {
                ts: now_iso(),
                event: "CYCLE_HEARTBEAT",
                ok,
                games_seen: 3,
                feeds_fetched: 3,
                notified: 0,
                delivery_failures: 0,
                tracked_games: 1,
                error: None,
            }).unwrap();
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let contents = fs::read_to_string(dir.join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "CYCLE_HEARTBEAT");
        assert_eq!(first["ok"], true);
        assert_eq!(first["games_seen"], 3);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn extra_innings_event_serializes_game_fields() {
        let ev = ExtraInningsEvent {
            ts: now_iso(),
            event: "EXTRA_INNINGS",
            game_pk: 100,
            home: "Yankees".to_string(),
            away: "Red Sox".to_string(),
            inning: 11,
            half: "Top".to_string(),
            delivery: "delivered".to_string(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["game_pk"], 100);
        assert_eq!(v["away"], "Red Sox");
        assert_eq!(v["delivery"], "delivered");
    }
}
