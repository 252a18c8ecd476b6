use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Result, TailError};

/// Size of `path` in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TailError::PathNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(TailError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Bytes from one backward read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    /// The window touched offset 0, or the read hit end-of-stream.
    pub reached_start: bool,
}

/// Reads fixed-size windows anchored to the end of a seekable stream.
///
/// Windows are addressed by a cursor: a non-positive offset from end-of-file
/// marking where the window starts. The end is the `file_size` snapshot taken
/// when the reader was built, so bytes appended later are not seen. A window
/// that would begin before offset 0 is cut down to the part that lies inside
/// the file, so bytes past the window's end are never returned twice.
pub struct ChunkReader<R> {
    inner: R,
    file_size: u64,
    window_size: usize,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(inner: R, file_size: u64, window_size: usize) -> Self {
        Self {
            inner,
            file_size,
            window_size,
        }
    }

    pub fn read_window(&mut self, cursor: i64) -> Result<Chunk> {
        let distance = cursor.unsigned_abs();
        let (start, len, mut reached_start) = if distance > self.file_size {
            let overshoot = distance - self.file_size;
            let len = (self.window_size as u64).saturating_sub(overshoot) as usize;
            (0, len, true)
        } else {
            (self.file_size - distance, self.window_size, false)
        };
        let offset = start as i64 - self.file_size as i64;

        self.inner
            .seek(SeekFrom::Start(start))
            .map_err(|source| TailError::Seek { offset, source })?;

        let mut bytes = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.inner.read(&mut bytes[filled..]) {
                Ok(0) => {
                    reached_start = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(TailError::Read { offset, source }),
            }
        }
        bytes.truncate(filled);

        tracing::trace!(cursor, offset, len = filled, reached_start, "Read window");
        Ok(Chunk {
            bytes,
            reached_start,
        })
    }
}
