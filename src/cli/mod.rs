use std::convert::Infallible;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::TailConfig;
use crate::tail::{reader, ReverseLineScanner, TailPrinter};
use crate::watch::FileWatcher;

#[derive(Parser, Debug)]
#[command(
    name = "tailwatch",
    version,
    about = "Print the last lines of a file and re-print them whenever it changes"
)]
pub struct Cli {
    /// File to tail
    pub file: PathBuf,

    /// Number of lines to show [default: 10]
    #[arg(short = 'n', long)]
    pub lines: Option<usize>,

    /// Bytes read per backward step [default: 16]
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Wait after a modification before re-reading, in milliseconds [default: 2000]
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// TOML file with `lines`, `window_size` and `debounce_ms`
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file values, overridden by flags.
    pub fn config(&self) -> Result<TailConfig> {
        let mut config = match &self.config {
            Some(path) => TailConfig::load(path)?,
            None => TailConfig::default(),
        };
        if let Some(lines) = self.lines {
            config.lines = lines;
        }
        if let Some(window_size) = self.window_size {
            config.window_size = window_size;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Print the tail of `path` once.
fn print_tail<W: Write>(
    printer: &mut TailPrinter<W>,
    scanner: &ReverseLineScanner,
    path: &Path,
    lines: usize,
) -> crate::error::Result<()> {
    let tail = scanner.tail(path, lines)?;
    printer.print(&tail)
}

/// Print the tail, then re-print it after every modification. Returns only on error.
pub fn run(cli: Cli) -> Result<Infallible> {
    let config = cli.config()?;
    let path = cli.file;

    // Fail before any output if the file is missing.
    reader::file_size(&path)?;

    let scanner = ReverseLineScanner::new(config.window_size);
    let mut printer = TailPrinter::new(io::stdout().lock());

    print_tail(&mut printer, &scanner, &path, config.lines)
        .with_context(|| format!("Failed to tail {}", path.display()))?;

    let mut watcher = FileWatcher::new(&path, config.debounce())?;
    let never = watcher
        .watch(|path| {
            printer.print_change_marker()?;
            print_tail(&mut printer, &scanner, path, config.lines)
        })
        .with_context(|| format!("Stopped watching {}", path.display()))?;
    match never {}
}
