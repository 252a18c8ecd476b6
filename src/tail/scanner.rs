use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use super::reader::ChunkReader;
use crate::error::{Result, TailError};

/// Line delimiter.
pub const DELIMITER: u8 = b'\n';

/// Lines collected from the end of a file, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineAccumulator {
    lines: Vec<Vec<u8>>,
    limit: usize,
}

impl LineAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: Vec::with_capacity(limit.min(1024)),
            limit,
        }
    }

    /// Add the line that precedes every line collected so far.
    fn push(&mut self, line: Vec<u8>) {
        debug_assert!(!self.is_full());
        self.lines.push(line);
    }

    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Lines in file order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.lines.iter().rev().map(Vec::as_slice)
    }
}

/// Result of one tail computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tail {
    /// The whole file fit in the first window; its bytes, untouched.
    Raw(Vec<u8>),
    Lines(LineAccumulator),
}

impl Tail {
    /// Lines in file order. A raw block counts as one line unless empty.
    #[cfg(test)]
    pub fn into_lines(self) -> Vec<Vec<u8>> {
        match self {
            Tail::Raw(bytes) if bytes.is_empty() => Vec::new(),
            Tail::Raw(bytes) => vec![bytes],
            Tail::Lines(mut acc) => {
                acc.lines.reverse();
                acc.lines
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    Exhausted,
}

/// Finds the last lines of a file by reading it backward in windows.
#[derive(Debug, Clone, Copy)]
pub struct ReverseLineScanner {
    window_size: usize,
}

impl ReverseLineScanner {
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be non-zero");
        Self { window_size }
    }

    /// Up to `n` lines from the end of `path`.
    ///
    /// The size is taken from the opened handle; bytes appended while the
    /// scan runs are left for the next one.
    pub fn tail(&self, path: &Path, n: usize) -> Result<Tail> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TailError::PathNotFound {
                path: path.to_path_buf(),
            },
            _ => TailError::Open {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let size = file
            .metadata()
            .map_err(|source| TailError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        tracing::debug!(path = %path.display(), size, lines = n, "Scanning tail");
        self.scan(file, size, n)
    }

    /// Scan an already opened stream of `size` bytes.
    pub fn scan<R: Read + Seek>(&self, inner: R, size: u64, n: usize) -> Result<Tail> {
        let mut reader = ChunkReader::new(inner, size, self.window_size);
        let window = self.window_size as i64;

        let mut cursor = -window;
        let mut chunk = reader.read_window(cursor)?;
        if chunk.reached_start {
            return Ok(Tail::Raw(chunk.bytes));
        }

        let mut lines = LineAccumulator::new(n);
        // Logical end of the unconsumed prefix of `chunk`.
        let mut end = chunk.bytes.len();
        // Bytes of a line that started in an earlier (later-in-file) window.
        let mut carry: Vec<u8> = Vec::new();
        // Still looking at the segment after the final delimiter.
        let mut trailing = true;
        let mut state = ScanState::Scanning;

        while state == ScanState::Scanning {
            if lines.is_full() {
                state = ScanState::Exhausted;
                continue;
            }

            match chunk.bytes[..end].iter().rposition(|&b| b == DELIMITER) {
                Some(pos) => {
                    let mut line = chunk.bytes[pos + 1..end].to_vec();
                    line.append(&mut carry);
                    if !(trailing && line.is_empty()) {
                        lines.push(line);
                    }
                    trailing = false;
                    end = pos;
                }
                None if !chunk.reached_start => {
                    if end == chunk.bytes.len() {
                        // No delimiter in the whole window: keep its bytes and
                        // move back a full window.
                        let mut prefix = std::mem::take(&mut chunk.bytes);
                        prefix.append(&mut carry);
                        carry = prefix;
                        cursor -= window;
                    } else {
                        // Next window ends where the unconsumed prefix ends.
                        cursor = cursor - window + end as i64;
                    }
                    chunk = reader.read_window(cursor)?;
                    end = chunk.bytes.len();
                }
                None => {
                    // Start of file bounds the first line.
                    let mut line = chunk.bytes[..end].to_vec();
                    line.append(&mut carry);
                    if !(trailing && line.is_empty()) {
                        lines.push(line);
                    }
                    state = ScanState::Exhausted;
                }
            }
        }

        tracing::debug!(lines = lines.len(), cursor, "Scan finished");
        Ok(Tail::Lines(lines))
    }
}
