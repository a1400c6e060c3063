//! Operator-visible mission event log.
//!
//! Keeps the last 50 entries for replay to newly connected monitoring
//! clients and broadcasts every new entry to the live WebSocket stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::listener::MissionListener;
use crate::network::NodeLabel;

const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    /// Wall-clock timestamp, epoch milliseconds
    pub timestamp: i64,
    pub level: LogLevel,
    pub message: String,
}

struct Inner {
    entries: Mutex<VecDeque<LogEntry>>,
    tx: broadcast::Sender<LogEntry>,
}

/// Cheap-to-clone handle; all clones feed the same buffer and stream.
#[derive(Clone)]
pub struct MissionLog {
    inner: Arc<Inner>,
}

impl MissionLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)),
                tx,
            }),
        }
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            level,
            message: message.into(),
        };
        {
            let mut entries = self.inner.entries.lock().unwrap();
            if entries.len() == LOG_CAPACITY {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        // nobody listening is fine
        let _ = self.inner.tx.send(entry);
    }

    /// The buffered entries, oldest first.
    pub fn replay(&self) -> Vec<LogEntry> {
        self.inner.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.inner.tx.subscribe()
    }
}

impl Default for MissionLog {
    fn default() -> Self {
        Self::new()
    }
}

// ── Vehicle event forwarding ──────────────────────────────────────────────────

/// Mirrors every vehicle event onto the operator log stream.
pub struct MissionLogListener {
    log: MissionLog,
}

impl MissionLogListener {
    pub fn new(log: MissionLog) -> Self {
        Self { log }
    }
}

impl MissionListener for MissionLogListener {
    fn on_start(&mut self, target: NodeLabel) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Info, format!("Start to {target}"));
        Box::pin(async { Ok(()) })
    }

    fn on_point_reached(&mut self) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Info, "Point reached");
        Box::pin(async { Ok(()) })
    }

    fn on_no_line_found(&mut self) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Warn, "No line found");
        Box::pin(async { Ok(()) })
    }

    fn on_next_point_blocked(&mut self) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Warn, "Next point blocked");
        Box::pin(async { Ok(()) })
    }

    fn on_obstacle_detected(&mut self) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Info, "Obstacle detected");
        Box::pin(async { Ok(()) })
    }

    fn on_aligned(&mut self, hold: bool) -> BoxFuture<'_, Result<()>> {
        let message = if hold { "Aligned (holding)" } else { "Aligned" };
        self.log.push(LogLevel::Info, message);
        Box::pin(async { Ok(()) })
    }

    fn on_returning(&mut self) -> BoxFuture<'_, Result<()>> {
        self.log.push(LogLevel::Warn, "Returning");
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_keeps_the_newest_entries() {
        let log = MissionLog::new();
        for i in 0..60 {
            log.push(LogLevel::Info, format!("entry {i}"));
        }
        let entries = log.replay();
        assert_eq!(entries.len(), 50);
        assert_eq!(entries.first().unwrap().message, "entry 10");
        assert_eq!(entries.last().unwrap().message, "entry 59");
    }

    #[test]
    fn subscribers_see_entries_pushed_after_subscribing() {
        let log = MissionLog::new();
        let mut rx = log.subscribe();
        log.push(LogLevel::Error, "mission aborted");
        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "mission aborted");
    }
}
