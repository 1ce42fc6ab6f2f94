//! Directory-backed entry store
//!
//! Reads a DropBox-style directory in which every entry is one file named
//! `<tag>@<timestamp_millis>.<ext>`. `.txt` and `.dat` files hold the payload,
//! `.lost` files mark entries whose payload was dropped by the producer.
//! Anything else in the directory is ignored.
//!
//! An opened store scans the directory once, on its first query, and answers
//! later queries from that sorted index. Entries written by other producers
//! show up the next time the store is opened.

use siphon_core::domain::entry::{CrashEntry, EntryInfo};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::EntryStore;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Text,
    Data,
    Lost,
}

impl EntryKind {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(EntryKind::Text),
            "dat" => Some(EntryKind::Data),
            "lost" => Some(EntryKind::Lost),
            _ => None,
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            EntryKind::Text => "txt",
            EntryKind::Data => "dat",
            EntryKind::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone)]
struct EntryFile {
    tag: String,
    timestamp_millis: i64,
    kind: EntryKind,
    path: PathBuf,
}

/// Splits `<tag>@<timestamp>.<ext>` into its parts
///
/// The tag may itself contain `@`; the last one separates the timestamp.
fn parse_file_name(name: &str) -> Option<(&str, i64, EntryKind)> {
    let (tag, rest) = name.rsplit_once('@')?;
    let (timestamp, ext) = rest.split_once('.')?;
    if tag.is_empty() {
        return None;
    }
    let timestamp = timestamp.parse::<i64>().ok()?;
    let kind = EntryKind::from_extension(ext)?;
    Some((tag, timestamp, kind))
}

fn validate_tag(tag: &str) -> Result<(), StoreError> {
    if tag.is_empty() || tag.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Payload whose file could not be opened; the first read reports why
struct UnopenedPayload(Option<io::Error>);

impl Read for UnopenedPayload {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(self
            .0
            .take()
            .unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound)))
    }
}

/// Crash-entry store kept as one file per entry in a directory
#[derive(Debug)]
pub struct DirectoryEntryStore {
    dir: PathBuf,
    /// Entry files sorted by tag, then timestamp
    index: Mutex<Option<Vec<EntryFile>>>,
}

impl Clone for DirectoryEntryStore {
    fn clone(&self) -> Self {
        Self::at(self.dir.clone())
    }
}

impl DirectoryEntryStore {
    /// Opens an existing store directory
    ///
    /// Fails with [`StoreError::Unavailable`] when the path is missing or is
    /// not a directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(Self::at(dir.to_path_buf())),
            Ok(_) => Err(StoreError::Unavailable {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            }),
            Err(e) => Err(StoreError::Unavailable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Opens the store directory, creating it first if needed
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::Unavailable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::open(dir)
    }

    fn at(dir: PathBuf) -> Self {
        Self {
            dir,
            index: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Result<Vec<EntryFile>, StoreError> {
        let mut files = Vec::new();

        for dirent in fs::read_dir(&self.dir)? {
            let dirent = dirent?;
            let name = dirent.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if let Some((tag, timestamp_millis, kind)) = parse_file_name(name) {
                files.push(EntryFile {
                    tag: tag.to_string(),
                    timestamp_millis,
                    kind,
                    path: dirent.path(),
                });
            }
        }

        Ok(files)
    }

    /// Lists entries newest first, optionally restricted to one tag
    pub fn list(&self, tag: Option<&str>) -> Result<Vec<EntryInfo>, StoreError> {
        let mut files: Vec<EntryFile> = self
            .scan()?
            .into_iter()
            .filter(|file| tag.is_none_or(|tag| file.tag == tag))
            .collect();

        files.sort_by(|a, b| {
            b.timestamp_millis
                .cmp(&a.timestamp_millis)
                .then_with(|| a.tag.cmp(&b.tag))
        });

        files
            .into_iter()
            .map(|file| -> Result<EntryInfo, StoreError> {
                let size_bytes = match file.kind {
                    EntryKind::Lost => 0,
                    _ => fs::metadata(&file.path)?.len(),
                };
                Ok(EntryInfo {
                    tag: file.tag,
                    timestamp_millis: file.timestamp_millis,
                    size_bytes,
                    lost: file.kind == EntryKind::Lost,
                })
            })
            .collect()
    }

    /// Adds an entry and returns the timestamp it was stored under
    ///
    /// Timestamps are unique per tag: a colliding timestamp is bumped by one
    /// millisecond until it is free. Payloads that are valid UTF-8 are stored
    /// as `.txt`, anything else as `.dat`.
    pub fn add_entry(
        &self,
        tag: &str,
        timestamp_millis: i64,
        payload: &[u8],
    ) -> Result<i64, StoreError> {
        validate_tag(tag)?;

        let taken: HashSet<i64> = self
            .scan()?
            .into_iter()
            .filter(|file| file.tag == tag)
            .map(|file| file.timestamp_millis)
            .collect();

        let mut timestamp = timestamp_millis;
        while taken.contains(&timestamp) {
            timestamp = timestamp
                .checked_add(1)
                .ok_or_else(|| StoreError::TimestampExhausted {
                    tag: tag.to_string(),
                    requested: timestamp_millis,
                })?;
        }

        let kind = if std::str::from_utf8(payload).is_ok() {
            EntryKind::Text
        } else {
            EntryKind::Data
        };

        // Written under an ignored extension first so readers never see a
        // partial payload
        let staging = self.dir.join(format!("{}@{}.tmp", tag, timestamp));
        let target = self
            .dir
            .join(format!("{}@{}.{}", tag, timestamp, kind.extension()));
        fs::write(&staging, payload)?;
        fs::rename(&staging, &target)?;
        *self.index.lock().unwrap_or_else(PoisonError::into_inner) = None;

        debug!(
            "Added entry {}@{} ({} bytes)",
            tag,
            timestamp,
            payload.len()
        );

        Ok(timestamp)
    }
}

impl EntryStore for DirectoryEntryStore {
    fn next_entry_before(
        &self,
        tag: &str,
        before_millis: i64,
    ) -> Result<Option<CrashEntry>, StoreError> {
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        if index.is_none() {
            let mut files = self.scan()?;
            files.sort_by(|a, b| {
                a.tag
                    .cmp(&b.tag)
                    .then_with(|| a.timestamp_millis.cmp(&b.timestamp_millis))
            });
            *index = Some(files);
        }
        let Some(files) = index.as_ref() else {
            return Ok(None);
        };

        let end = files.partition_point(|file| {
            (file.tag.as_str(), file.timestamp_millis) < (tag, before_millis)
        });
        let Some(file) = files[..end].last().filter(|file| file.tag == tag) else {
            return Ok(None);
        };

        let entry = match file.kind {
            EntryKind::Lost => CrashEntry::lost(file.tag.clone(), file.timestamp_millis),
            EntryKind::Text | EntryKind::Data => {
                // A payload that vanished since the scan fails only this entry
                let payload: Box<dyn Read + Send> = match File::open(&file.path) {
                    Ok(handle) => Box::new(handle),
                    Err(e) => {
                        debug!(
                            "Payload of {}@{} could not be opened: {}",
                            file.tag, file.timestamp_millis, e
                        );
                        Box::new(UnopenedPayload(Some(e)))
                    }
                };
                CrashEntry::new(file.tag.clone(), file.timestamp_millis, payload)
            }
        };

        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectError;
    use crate::service::drain;
    use crate::sink::LogSink;
    use siphon_core::domain::job::StopReason;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl LogSink for RecordingSink {
        fn emit(&self, _tag: &str, text: &str) {
            self.messages.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("system_app_crash@1700000000000.txt"),
            Some(("system_app_crash", 1_700_000_000_000, EntryKind::Text))
        );
        assert_eq!(
            parse_file_name("user@host@42.lost"),
            Some(("user@host", 42, EntryKind::Lost))
        );
        assert_eq!(parse_file_name("crash@42.gz"), None);
        assert_eq!(parse_file_name("crash@abc.txt"), None);
        assert_eq!(parse_file_name("@42.txt"), None);
        assert_eq!(parse_file_name("README"), None);
    }

    #[test]
    fn test_open_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = DirectoryEntryStore::open(tmp.path().join("missing"));
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_open_file_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        let result = DirectoryEntryStore::open(&file);
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_walks_backward_by_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("crash", 100, b"first").unwrap();
        store.add_entry("crash", 300, b"second").unwrap();
        store.add_entry("anr", 200, b"other tag").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

        let mut entry = store.next_entry_before("crash", 1_000).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 300);
        assert_eq!(entry.read_payload().unwrap(), b"second");

        let mut entry = store.next_entry_before("crash", 300).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 100);
        assert_eq!(entry.read_payload().unwrap(), b"first");

        assert!(store.next_entry_before("crash", 100).unwrap().is_none());
    }

    #[test]
    fn test_lost_entry_has_empty_payload() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("crash@50.lost"), b"").unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();

        let mut entry = store.next_entry_before("crash", 60).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 50);
        assert!(entry.read_payload().unwrap().is_empty());
    }

    #[test]
    fn test_add_entry_bumps_colliding_timestamp() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();

        assert_eq!(store.add_entry("crash", 10, b"a").unwrap(), 10);
        assert_eq!(store.add_entry("crash", 10, b"b").unwrap(), 11);
        assert_eq!(store.add_entry("anr", 10, b"c").unwrap(), 10);
    }

    #[test]
    fn test_add_entry_at_max_timestamp_does_not_wrap() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();

        assert_eq!(store.add_entry("crash", i64::MAX, b"a").unwrap(), i64::MAX);
        let result = store.add_entry("crash", i64::MAX, b"b");
        assert!(matches!(
            result,
            Err(StoreError::TimestampExhausted { requested: i64::MAX, .. })
        ));
        assert_eq!(store.list(Some("crash")).unwrap().len(), 1);
    }

    #[test]
    fn test_add_entry_binary_payload_is_dat() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();

        store.add_entry("crash", 5, &[0xff, 0xfe]).unwrap();
        assert!(tmp.path().join("crash@5.dat").exists());
        assert!(!tmp.path().join("crash@5.tmp").exists());
    }

    #[test]
    fn test_add_entry_rejects_path_tags() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();

        let result = store.add_entry("../escape", 1, b"x");
        assert!(matches!(result, Err(StoreError::InvalidTag(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("crash", 100, b"12345").unwrap();
        store.add_entry("anr", 200, b"1").unwrap();
        fs::write(tmp.path().join("crash@300.lost"), b"").unwrap();

        let all = store.list(None).unwrap();
        let order: Vec<i64> = all.iter().map(|info| info.timestamp_millis).collect();
        assert_eq!(order, vec![300, 200, 100]);
        assert!(all[0].lost);
        assert_eq!(all[2].size_bytes, 5);

        let crashes = store.list(Some("crash")).unwrap();
        assert_eq!(crashes.len(), 2);
    }

    #[test]
    fn test_create_makes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("dropbox");
        let store = DirectoryEntryStore::create(&dir).unwrap();
        assert_eq!(store.dir(), dir.as_path());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_dangling_payload_fails_only_that_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("crash", 300, b"newest").unwrap();
        store.add_entry("crash", 100, b"oldest").unwrap();
        let dangling = tmp.path().join("crash@200.txt");
        std::os::unix::fs::symlink(tmp.path().join("gone"), &dangling).unwrap();

        let mut entry = store.next_entry_before("crash", 300).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 200);
        assert!(entry.read_payload().is_err());

        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        let result = drain(&store, &sink, "crash", 1_000, None, &cancel);

        let (failed, stats, stop) = match result {
            Err(CollectError::PartialDecodeFailures {
                failed,
                stats,
                stop,
            }) => (failed, stats, stop),
            other => panic!("expected a partial failure, got {:?}", other),
        };
        assert_eq!(failed, 1);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.oldest_timestamp_millis, Some(100));
        assert_eq!(stop, StopReason::Exhausted);
        assert_eq!(*sink.messages.lock().unwrap(), vec!["newest", "oldest"]);
    }

    #[test]
    fn test_payload_removed_after_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("crash", 20, b"second").unwrap();
        store.add_entry("crash", 10, b"first").unwrap();

        let mut entry = store.next_entry_before("crash", 100).unwrap().unwrap();
        assert_eq!(entry.read_payload().unwrap(), b"second");

        fs::remove_file(tmp.path().join("crash@10.txt")).unwrap();

        let mut entry = store.next_entry_before("crash", 20).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 10);
        let err = entry.read_payload().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(store.next_entry_before("crash", 10).unwrap().is_none());
    }

    #[test]
    fn test_index_is_scanned_once_per_open() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("crash", 10, b"a").unwrap();
        assert!(store.next_entry_before("crash", 100).unwrap().is_some());

        // Written behind the store's back: invisible until reopened
        fs::write(tmp.path().join("crash@50.txt"), b"late").unwrap();
        let entry = store.next_entry_before("crash", 100).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 10);

        let reopened = DirectoryEntryStore::open(tmp.path()).unwrap();
        let entry = reopened.next_entry_before("crash", 100).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 50);

        // Writes through the store itself are picked up
        store.add_entry("crash", 70, b"own").unwrap();
        let entry = store.next_entry_before("crash", 100).unwrap().unwrap();
        assert_eq!(entry.timestamp_millis(), 70);
    }

    #[test]
    fn test_lookup_does_not_cross_tags() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryEntryStore::open(tmp.path()).unwrap();
        store.add_entry("anr", 5, b"x").unwrap();
        store.add_entry("crash", 500, b"y").unwrap();
        store.add_entry("zzz", 1, b"z").unwrap();

        assert!(store.next_entry_before("crash", 500).unwrap().is_none());
        assert!(store.next_entry_before("bbb", 1_000).unwrap().is_none());
        assert_eq!(
            store
                .next_entry_before("anr", 1_000)
                .unwrap()
                .unwrap()
                .timestamp_millis(),
            5
        );
    }
}
