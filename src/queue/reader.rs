//! Drains a newline-delimited JSON queue file under an advisory exclusive
//! lock, so an external process appending entries never races the server
//! reading them.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::{broadcast::Target, error::Result};

fn default_kind() -> String {
    "broadcast".to_string()
}

/// One line of the queue file: the record shape an external process (a CLI
/// script, a worker outside this process) appends to push a message into the
/// running server without an extra network hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Record discriminator. Only `"broadcast"` is currently meaningful;
    /// kept on the wire so the format can grow other record kinds later.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// The event name delivered to each reached client.
    pub event: String,
    /// The JSON payload attached to the event.
    pub data: serde_json::Value,
    /// Restrict delivery to this namespace. `None` reaches every namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Restrict delivery to this room within `namespace`. Ignored if
    /// `namespace` is absent.
    #[serde(default)]
    pub room: Option<String>,
}

impl QueueEntry {
    /// The broadcast target this entry resolves to, following the same
    /// namespace/room resolution rule as an in-process broadcast call.
    pub fn target(&self) -> Target {
        Target::from_scope(self.namespace.clone(), self.room.clone())
    }
}

/// Reads and truncates the broadcast queue file on each [`drain`](QueueReader::drain) call.
#[derive(Debug)]
pub struct QueueReader {
    path: PathBuf,
}

impl QueueReader {
    /// Point a reader at `path`. The file is created on first drain if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this reader drains.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete line currently in the queue file and truncate the
    /// file down to whatever trailing fragment hasn't been terminated by a
    /// newline yet, all under one exclusive lock. A malformed complete line
    /// is logged and skipped; a partial trailing line (a concurrent writer
    /// caught mid-append) is left in the file for the next `drain()` instead.
    pub fn drain(&self) -> Result<Vec<QueueEntry>> {
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(&self.path)?;
        file.lock_exclusive()?;

        let result = Self::read_and_clear(&mut file);

        // Best-effort: an unlock failure doesn't invalidate the entries we already read.
        let _ = fs2::FileExt::unlock(&file);

        result
    }

    fn read_and_clear(file: &mut File) -> Result<Vec<QueueEntry>> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let (complete, partial) = Self::split_trailing_fragment(&contents);

        let mut entries = Vec::new();
        for (lineno, line) in complete.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<QueueEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => log::warn!("dropping malformed queue entry at line {}: {err}", lineno + 1),
            }
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        if !partial.is_empty() {
            file.write_all(partial.as_bytes())?;
        }
        file.flush()?;

        Ok(entries)
    }

    /// Split `contents` into its complete, newline-terminated lines and a
    /// trailing fragment not yet terminated by `\n` (the record a concurrent
    /// appender was still writing when the lock was acquired). Returns an
    /// empty fragment when `contents` is empty or already ends in `\n`.
    fn split_trailing_fragment(contents: &str) -> (&str, &str) {
        if contents.is_empty() || contents.ends_with('\n') {
            return (contents, "");
        }

        match contents.rfind('\n') {
            Some(idx) => contents.split_at(idx + 1),
            None => ("", contents),
        }
    }
}
