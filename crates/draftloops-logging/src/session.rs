use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One line of a session JSONL file
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLine<'a> {
    SessionStart {
        timestamp: DateTime<Utc>,
        run_id: &'a str,
        topic: &'a str,
        oracle: &'a str,
        model: Option<&'a str>,
        dimensions: &'a [String],
        max_attempts: usize,
        quality_threshold: f64,
    },
    /// Any serializable attempt record, flattened into the line
    Attempt {
        #[serde(flatten)]
        record: serde_json::Value,
    },
    SessionEnd {
        outcome: &'a str,
        attempts: usize,
        best_attempt: Option<usize>,
        best_score: f64,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Writes an audit trail of one run as JSONL
pub struct SessionWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SessionWriter {
    /// Open a session file under `<data dir>/draftloops/sessions/`
    pub fn new(topic: &str) -> io::Result<Self> {
        Self::in_dir(&Self::sessions_dir()?, topic)
    }

    /// Open a session file in `dir`, named from the current UTC time and a
    /// short hash of the topic
    pub fn in_dir(dir: &Path, topic: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
        let hash = hex::encode(Sha256::digest(topic.as_bytes()));
        let path = dir.join(format!("{}_{}.jsonl", timestamp, &hash[..6]));

        let file = File::create(&path)?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, line: &SessionLine<'_>) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    /// Record an attempt; the record must serialize to a JSON object
    pub fn write_attempt<T: Serialize>(&self, record: &T) {
        if let Ok(record) = serde_json::to_value(record) {
            self.write(&SessionLine::Attempt { record });
        }
    }

    fn sessions_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("draftloops").join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Record {
        index: usize,
        overall: f64,
    }

    #[test]
    fn test_session_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SessionWriter::in_dir(dir.path(), "Quantum Computing").unwrap();
        let dims = vec!["relevance".to_string()];

        writer.write(&SessionLine::SessionStart {
            timestamp: Utc::now(),
            run_id: "run-1",
            topic: "Quantum Computing",
            oracle: "gemini",
            model: None,
            dimensions: &dims,
            max_attempts: 3,
            quality_threshold: 95.0,
        });
        writer.write_attempt(&Record {
            index: 0,
            overall: 70.0,
        });
        writer.write(&SessionLine::SessionEnd {
            outcome: "budget_exhausted",
            attempts: 1,
            best_attempt: Some(0),
            best_score: 70.0,
            duration_secs: 1.0,
            timestamp: Utc::now(),
        });

        let name = writer.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".jsonl"));

        let content = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "session_start");
        assert_eq!(lines[1]["type"], "attempt");
        assert_eq!(lines[1]["overall"], 70.0);
        assert_eq!(lines[2]["best_attempt"], 0);
    }
}
