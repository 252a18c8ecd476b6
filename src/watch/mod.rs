//! Blocking change-notification loop for a single file.

pub mod event;

use std::convert::Infallible;
use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use nix::errno::Errno;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use tokio_util::codec::Decoder;

use crate::error::{Result, TailError};
use event::{EventCodec, HEADER_LEN};

/// Read buffer capacity, in fixed-size record headers.
const EVENT_BUFFER_RECORDS: usize = 128;

/// A blocking stream of raw change-notification records.
pub trait EventSource {
    /// Block until notifications are available and copy them into `buf`.
    fn read_events(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// inotify watch on one path, registered for all event kinds.
///
/// The watch is removed when the source is dropped; the descriptor closes
/// with it.
pub struct InotifySource {
    inotify: Inotify,
    wd: WatchDescriptor,
}

impl InotifySource {
    pub fn new(path: &Path) -> Result<Self> {
        let inotify = Inotify::init(InitFlags::IN_CLOEXEC).map_err(TailError::WatchInit)?;
        let wd = inotify
            .add_watch(path, AddWatchFlags::IN_ALL_EVENTS)
            .map_err(|source| TailError::WatchRegister {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), ?wd, "Registered watch");
        Ok(Self { inotify, wd })
    }
}

impl EventSource for InotifySource {
    fn read_events(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match nix::unistd::read(self.inotify.as_fd().as_raw_fd(), buf) {
                Ok(n) => return Ok(n),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(TailError::WatchRead(e)),
            }
        }
    }
}

impl Drop for InotifySource {
    fn drop(&mut self) {
        if let Err(e) = self.inotify.rm_watch(self.wd) {
            // Already gone if the file was deleted.
            tracing::debug!(error = %e, "Failed to remove watch");
        }
    }
}

/// Re-runs a callback whenever the watched file's content is modified.
pub struct FileWatcher<S> {
    source: S,
    path: PathBuf,
    debounce: Duration,
}

impl FileWatcher<InotifySource> {
    pub fn new(path: &Path, debounce: Duration) -> Result<Self> {
        let source = InotifySource::new(path)?;
        Ok(Self::with_source(source, path, debounce))
    }
}

impl<S: EventSource> FileWatcher<S> {
    pub fn with_source(source: S, path: &Path, debounce: Duration) -> Self {
        Self {
            source,
            path: path.to_path_buf(),
            debounce,
        }
    }

    /// Loop forever. For each modification record, sleep for the debounce
    /// interval, then call `on_modified` before looking at the next record.
    ///
    /// Events that arrive during the sleep wait in the kernel queue and are
    /// handled by later iterations. Only errors end the loop.
    pub fn watch<F>(&mut self, mut on_modified: F) -> Result<Infallible>
    where
        F: FnMut(&Path) -> Result<()>,
    {
        let mut raw = vec![0u8; HEADER_LEN * EVENT_BUFFER_RECORDS];
        let mut codec = EventCodec;

        tracing::info!(path = %self.path.display(), debounce = ?self.debounce, "Watching for changes");

        loop {
            let n = self.source.read_events(&mut raw)?;
            if n < HEADER_LEN {
                tracing::debug!(bytes = n, "Short notification read, retrying");
                continue;
            }

            let mut buf = BytesMut::from(&raw[..n]);
            while let Some(event) = codec.decode(&mut buf).map_err(TailError::WatchDecode)? {
                tracing::trace!(
                    wd = event.wd,
                    flags = ?event.flags(),
                    cookie = event.cookie,
                    name_len = event.name_len,
                    "Change event"
                );
                if !event.is_modify() {
                    continue;
                }

                tracing::debug!(path = %self.path.display(), "File modified");
                std::thread::sleep(self.debounce);
                on_modified(&self.path)?;
            }

            if !buf.is_empty() {
                tracing::debug!(bytes = buf.len(), "Dropped incomplete notification record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::event::encode_record;
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned reads, then fails.
    struct ScriptedSource {
        reads: VecDeque<Vec<u8>>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Vec<u8>>) -> Self {
            Self {
                reads: reads.into(),
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn read_events(&mut self, buf: &mut [u8]) -> Result<usize> {
            let next = self
                .reads
                .pop_front()
                .ok_or(TailError::WatchRead(Errno::EIO))?;
            buf[..next.len()].copy_from_slice(&next);
            Ok(next.len())
        }
    }

    fn run_script(reads: Vec<Vec<u8>>) -> (usize, TailError) {
        let mut watcher = FileWatcher::with_source(
            ScriptedSource::new(reads),
            Path::new("/tmp/app.log"),
            Duration::ZERO,
        );
        let mut calls = 0;
        let err = watcher
            .watch(|path| {
                assert_eq!(path, Path::new("/tmp/app.log"));
                calls += 1;
                Ok(())
            })
            .unwrap_err();
        (calls, err)
    }

    #[test]
    fn test_only_modify_triggers_callback() {
        let mut read = Vec::new();
        encode_record(&mut read, AddWatchFlags::IN_OPEN, b"");
        encode_record(&mut read, AddWatchFlags::IN_MODIFY, b"");
        encode_record(&mut read, AddWatchFlags::IN_ACCESS, b"");
        encode_record(&mut read, AddWatchFlags::IN_MODIFY, b"name\0\0\0\0");
        encode_record(&mut read, AddWatchFlags::IN_CLOSE_WRITE, b"");

        let (calls, err) = run_script(vec![read]);
        assert_eq!(calls, 2);
        assert!(matches!(err, TailError::WatchRead(Errno::EIO)));
    }

    #[test]
    fn test_short_read_is_skipped() {
        let mut modify = Vec::new();
        encode_record(&mut modify, AddWatchFlags::IN_MODIFY, b"");

        let (calls, _) = run_script(vec![vec![0u8; HEADER_LEN - 1], Vec::new(), modify]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_each_read_is_processed() {
        let mut modify = Vec::new();
        encode_record(&mut modify, AddWatchFlags::IN_MODIFY, b"");

        let (calls, _) = run_script(vec![modify.clone(), modify.clone(), modify]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_callback_error_ends_loop() {
        let mut read = Vec::new();
        encode_record(&mut read, AddWatchFlags::IN_MODIFY, b"");
        encode_record(&mut read, AddWatchFlags::IN_MODIFY, b"");

        let mut watcher = FileWatcher::with_source(
            ScriptedSource::new(vec![read]),
            Path::new("/tmp/gone.log"),
            Duration::ZERO,
        );
        let mut calls = 0;
        let err = watcher
            .watch(|path| {
                calls += 1;
                Err(TailError::PathNotFound {
                    path: path.to_path_buf(),
                })
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, TailError::PathNotFound { .. }));
    }

    #[test]
    fn test_register_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = InotifySource::new(&dir.path().join("missing.log")).err().unwrap();
        assert!(matches!(err, TailError::WatchRegister { .. }));
    }

    #[test]
    fn test_append_triggers_one_rescan() {
        use crate::tail::ReverseLineScanner;
        use std::io::Write;
        use std::sync::mpsc;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let content: Vec<u8> = (b'a'..=b'z').flat_map(|c| [c, b'\n']).collect();
        std::fs::write(&path, &content).unwrap();

        let scanner = ReverseLineScanner::new(16);
        let initial = scanner.tail(&path, 10).unwrap().into_lines();
        assert_eq!(initial.last().unwrap(), b"z");

        let mut watcher = FileWatcher::new(&path, Duration::from_millis(50)).unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = watcher.watch(|path| {
                let lines = scanner.tail(path, 10)?.into_lines();
                let _ = tx.send(lines);
                Ok(())
            });
        });

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(b"new\n").unwrap();
        drop(file);

        let lines = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines.first().unwrap(), b"r");
        assert_eq!(lines.last().unwrap(), b"new");
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }
}
