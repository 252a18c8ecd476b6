use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while computing a tail or watching a file.
///
/// None of these are retried. End-of-stream inside a window read is not an
/// error; the reader reports it as having reached the start of the file.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("{} file does not exist", .path.display())]
    PathNotFound { path: PathBuf },

    #[error("failed to stat {}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to seek to offset {offset} from end of file")]
    Seek {
        offset: i64,
        #[source]
        source: io::Error,
    },

    #[error("failed to read window at offset {offset} from end of file")]
    Read {
        offset: i64,
        #[source]
        source: io::Error,
    },

    #[error("failed to initialize change notifications")]
    WatchInit(#[source] nix::Error),

    #[error("failed to watch {}", .path.display())]
    WatchRegister {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("failed to read change notifications")]
    WatchRead(#[source] nix::Error),

    #[error("malformed change notification")]
    WatchDecode(#[source] io::Error),

    #[error("failed to write tail output")]
    Output(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TailError>;
