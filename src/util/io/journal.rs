// src/util/io/journal.rs
//! Journal channel - durable append log of readings as JSON lines.
//!
//! Lets the ingestion and monitoring processes run separately: the ingester
//! appends to the file, monitors tail it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;

use crate::error::{PublishError, SubscriptionError};
use crate::util::io::bus::{EntrySender, LogEntry, Subscription, TelemetryChannel};
use crate::util::io::serial::Reading;
use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

const TAIL_CHUNK: u64 = 8 * 1024;

#[derive(Debug)]
struct JournalWriter {
    file: File,
    next_sequence: u64,
}

#[derive(Debug, Clone)]
pub struct JournalChannel {
    path: PathBuf,
    poll_interval: Duration,
    writer: Arc<Mutex<Option<JournalWriter>>>,
}

impl JournalChannel {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            writer: Arc::new(Mutex::new(None)),
        }
    }

    fn open_writer(&self) -> Result<JournalWriter, PublishError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let (last, _) = read_tail(&self.path, 1)?;
        let next_sequence = last.last().map(|entry| entry.sequence + 1).unwrap_or(0);

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        log_info!("Journal {} opened for append at sequence {}", self.path.display(), next_sequence);

        Ok(JournalWriter { file, next_sequence })
    }
}

impl TelemetryChannel for JournalChannel {
    fn append(&self, reading: &Reading) -> Result<u64, PublishError> {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(self.open_writer()?);
        }
        let Some(writer) = guard.as_mut() else {
            return Err(PublishError::ChannelClosed);
        };

        let entry = LogEntry {
            sequence: writer.next_sequence,
            reading: reading.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Err(e) = writer.file.write_all(line.as_bytes()).and_then(|_| writer.file.flush()) {
            // Reopen on the next append; the file may have been rotated away
            *guard = None;
            return Err(e.into());
        }

        writer.next_sequence += 1;
        Ok(entry.sequence)
    }

    fn subscribe_from_latest(&self, n: usize) -> Result<Subscription, SubscriptionError> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let (entries, offset) = read_tail(&self.path, n)?;
        if !self.path.exists() {
            log_info!("Journal {} does not exist yet, waiting for entries", self.path.display());
        }

        // The tail task resumes right after the last complete line
        let backlog = entries.len();
        for entry in entries {
            let _ = sender.send(Ok(entry));
        }

        let feeder = tokio::spawn(tail_journal(
            self.path.clone(),
            offset,
            self.poll_interval,
            sender,
        ));

        Ok(Subscription::with_feeder(receiver, backlog, feeder))
    }
}

/// The last `n` complete entries, oldest first, and the offset just past the
/// last complete line. Reads backwards from the end in fixed chunks, so the
/// cost follows `n` rather than the journal size.
fn read_tail(path: &Path, n: usize) -> std::io::Result<(Vec<LogEntry>, u64)> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };

    let mut start = file.metadata()?.len();
    // Bytes from `start` up to the end of the last complete line not yet parsed
    let mut tail: Vec<u8> = Vec::new();
    let mut end: Option<u64> = None;
    let mut newest_first = Vec::new();

    while end.is_none() || newest_first.len() < n {
        if end.is_some() {
            let body = tail.len() - 1;
            if let Some(i) = tail[..body].iter().rposition(|b| *b == b'\n') {
                newest_first.extend(parse_entry(&String::from_utf8_lossy(&tail[i + 1..body]), path));
                tail.truncate(i + 1);
                continue;
            }
            if start == 0 {
                newest_first.extend(parse_entry(&String::from_utf8_lossy(&tail[..body]), path));
                break;
            }
        } else if start == 0 {
            break;
        }

        let from = start.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (start - from) as usize];
        file.seek(SeekFrom::Start(from))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&tail);
        tail = chunk;
        start = from;

        // A partial trailing write is left for the tail task
        if end.is_none() {
            if let Some(i) = tail.iter().rposition(|b| *b == b'\n') {
                end = Some(start + i as u64 + 1);
                tail.truncate(i + 1);
            }
        }
    }

    newest_first.truncate(n);
    newest_first.reverse();
    Ok((newest_first, end.unwrap_or(0)))
}

fn parse_entry(line: &str, path: &Path) -> Option<LogEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogEntry>(line) {
        Ok(entry) => Some(entry),
        Err(e) => {
            log_warn!("Skipping corrupt journal entry in {}: {}", path.display(), e);
            None
        }
    }
}

/// Poll the journal for bytes past `offset` and forward complete lines.
async fn tail_journal(path: PathBuf, mut offset: u64, poll_interval: Duration, sender: EntrySender) {
    let mut pending = Vec::new();
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        ticker.tick().await;
        if sender.is_closed() {
            break;
        }

        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                log_warn!("Journal {} unreadable: {}", path.display(), e);
                let _ = sender.send(Err(e.into()));
                break;
            }
        };

        let len = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(e) => {
                let _ = sender.send(Err(e.into()));
                break;
            }
        };

        if len < offset {
            log_warn!("Journal {} shrank ({} < {}), reading from start", path.display(), len, offset);
            offset = 0;
            pending.clear();
        }
        if len == offset {
            continue;
        }

        let mut chunk = Vec::new();
        let read = async {
            file.seek(std::io::SeekFrom::Start(offset)).await?;
            file.read_to_end(&mut chunk).await
        };
        if let Err(e) = read.await {
            let _ = sender.send(Err(e.into()));
            break;
        }
        offset += chunk.len() as u64;
        pending.extend_from_slice(&chunk);

        // Only complete lines; a partial trailing write stays pending
        while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&line);
            if let Some(entry) = parse_entry(&text, &path) {
                log_debug!("Journal delivered sequence {}", entry.sequence);
                if sender.send(Ok(entry)).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::io::serial::GasStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_then_backlog() {
        let dir = TempDir::new().unwrap();
        let journal = JournalChannel::new(dir.path().join("readings.jsonl"), Duration::from_millis(10));

        for value in [10, 20, 30] {
            journal.append(&Reading::new(value, GasStatus::Normal)).unwrap();
        }

        let mut subscription = journal.subscribe_from_latest(2).unwrap();
        let first = subscription.next_entry().await.unwrap().unwrap();
        let second = subscription.next_entry().await.unwrap().unwrap();

        assert_eq!((first.sequence, first.reading.value), (1, 20));
        assert_eq!((second.sequence, second.reading.value), (2, 30));
    }

    #[tokio::test]
    async fn test_tail_picks_up_new_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("readings.jsonl");
        let journal = JournalChannel::new(&path, Duration::from_millis(10));

        let mut subscription = journal.subscribe_from_latest(1).unwrap();
        journal.append(&Reading::new(150, GasStatus::Leak)).unwrap();
        journal.append(&Reading::new(40, GasStatus::Normal)).unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), subscription.next_entry())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), subscription.next_entry())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(first.reading.value, 150);
        assert_eq!(first.reading.status, GasStatus::Leak);
        assert_eq!(second.reading.value, 40);
    }

    #[tokio::test]
    async fn test_reopened_journal_continues_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.jsonl");

        JournalChannel::new(&path, DEFAULT_POLL_INTERVAL)
            .append(&Reading::new(1, GasStatus::Normal))
            .unwrap();
        let sequence = JournalChannel::new(&path, DEFAULT_POLL_INTERVAL)
            .append(&Reading::new(2, GasStatus::Normal))
            .unwrap();

        assert_eq!(sequence, 1);
        assert_eq!(read_tail(&path, 10).unwrap().0.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.jsonl");
        let journal = JournalChannel::new(&path, DEFAULT_POLL_INTERVAL);

        journal.append(&Reading::new(5, GasStatus::Normal)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "not json").unwrap();
        }
        journal.append(&Reading::new(6, GasStatus::Normal)).unwrap();

        let values: Vec<i64> = read_tail(&path, 10).unwrap().0.iter().map(|e| e.reading.value).collect();
        assert_eq!(values, vec![5, 6]);

        // A fresh writer continues after the last valid entry, even behind garbage
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "not json either").unwrap();
        }
        let reopened = JournalChannel::new(&path, DEFAULT_POLL_INTERVAL);
        assert_eq!(reopened.append(&Reading::new(7, GasStatus::Normal)).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_large_journal_backlog_comes_from_the_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.jsonl");
        {
            let mut file = File::create(&path).unwrap();
            for sequence in 0..5_000u64 {
                let entry = LogEntry {
                    sequence,
                    reading: Reading::new(sequence as i64 % 300, GasStatus::Normal),
                };
                writeln!(file, "{}", serde_json::to_string(&entry).unwrap()).unwrap();
            }
            // Writer caught mid-line
            write!(file, "{{\"sequence\":5000,\"rea").unwrap();
        }

        let (tail, offset) = read_tail(&path, 3).unwrap();
        let sequences: Vec<u64> = tail.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![4997, 4998, 4999]);
        assert!(offset < std::fs::metadata(&path).unwrap().len());

        let journal = JournalChannel::new(&path, Duration::from_millis(10));
        let mut subscription = journal.subscribe_from_latest(2).unwrap();
        assert_eq!(subscription.backlog(), 2);
        assert_eq!(subscription.next_entry().await.unwrap().unwrap().sequence, 4998);
        assert_eq!(subscription.next_entry().await.unwrap().unwrap().sequence, 4999);

        // The partial line is delivered once it is completed
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            let rest = serde_json::to_string(&Reading::new(42, GasStatus::Normal)).unwrap();
            writeln!(file, "ding\":{}}}", rest).unwrap();
        }
        let completed = tokio::time::timeout(Duration::from_secs(2), subscription.next_entry())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!((completed.sequence, completed.reading.value), (5000, 42));
    }

    #[test]
    fn test_read_tail_of_missing_or_partial_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.jsonl");
        assert_eq!(read_tail(&path, 5).unwrap(), (Vec::new(), 0));

        std::fs::write(&path, "{\"sequence\":0").unwrap();
        assert_eq!(read_tail(&path, 5).unwrap(), (Vec::new(), 0));
    }
}
