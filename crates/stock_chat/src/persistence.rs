use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordRole {
    User,
    Model,
}

/// One persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub user_id: String,
    pub role: RecordRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(user_id: &str, role: RecordRole, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            anyhow::bail!("Cannot store an empty {:?} message", role);
        }
        Ok(Self {
            user_id: user_id.to_string(),
            role,
            content,
            timestamp: Utc::now(),
        })
    }
}

/// Append-only store of chat messages per user
pub trait MessageLog: Send + Sync {
    fn append(&self, record: &ChatRecord) -> Result<()>;

    /// All records of a user, oldest first
    fn history(&self, user_id: &str) -> Result<Vec<ChatRecord>>;
}

/// Stores one JSON-lines file per user
pub struct FileMessageLog {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMessageLog {
    pub fn new(root_dir: PathBuf) -> Self {
        info!("Storing message log in: {:?}", root_dir);
        Self {
            root_dir,
            write_lock: Mutex::new(()),
        }
    }

    fn ensure_history_dir(&self) -> Result<PathBuf> {
        let dir = self.root_dir.join("history");
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(dir)
    }

    fn user_file_path(&self, user_id: &str) -> Result<PathBuf> {
        let file_name: String = user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.ensure_history_dir()?.join(format!("{file_name}.jsonl")))
    }
}

impl MessageLog for FileMessageLog {
    fn append(&self, record: &ChatRecord) -> Result<()> {
        let path = self.user_file_path(&record.user_id)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Message log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())?;
        debug!("Appended {:?} message to {}", record.role, path.display());
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<ChatRecord>> {
        let path = self.user_file_path(user_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }
}

/// Keeps records in memory only
#[derive(Default)]
pub struct MemoryMessageLog {
    records: Mutex<Vec<ChatRecord>>,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageLog for MemoryMessageLog {
    fn append(&self, record: &ChatRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("Message log lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<ChatRecord>> {
        Ok(self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("Message log lock poisoned"))?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
