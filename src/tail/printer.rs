use std::io::Write;

use super::scanner::{Tail, DELIMITER};
use crate::error::{Result, TailError};

const CHANGE_MARKER: &[u8] = b"\nFile has been modified\n";

/// Writes tails in file order.
pub struct TailPrinter<W> {
    out: W,
}

impl<W: Write> TailPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn print(&mut self, tail: &Tail) -> Result<()> {
        match tail {
            // Printed as-is, no delimiter appended.
            Tail::Raw(bytes) => self.out.write_all(bytes).map_err(TailError::Output)?,
            Tail::Lines(lines) => {
                for line in lines.iter() {
                    self.out.write_all(line).map_err(TailError::Output)?;
                    self.out.write_all(&[DELIMITER]).map_err(TailError::Output)?;
                }
            }
        }
        self.out.flush().map_err(TailError::Output)
    }

    /// Separator written ahead of a re-scan triggered by a file change.
    pub fn print_change_marker(&mut self) -> Result<()> {
        self.out.write_all(CHANGE_MARKER).map_err(TailError::Output)?;
        self.out.flush().map_err(TailError::Output)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::ReverseLineScanner;
    use std::io::Cursor;

    fn render(content: &[u8], window: usize, n: usize) -> String {
        let tail = ReverseLineScanner::new(window)
            .scan(Cursor::new(content.to_vec()), content.len() as u64, n)
            .unwrap();
        let mut printer = TailPrinter::new(Vec::new());
        printer.print(&tail).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_prints_oldest_first() {
        let content: Vec<u8> = (b'a'..=b'z').flat_map(|c| [c, b'\n']).collect();
        assert_eq!(render(&content, 16, 10), "q\nr\ns\nt\nu\nv\nw\nx\ny\nz\n");
    }

    #[test]
    fn test_preserves_whitespace() {
        let content = b"  leading\ntrailing  \n\tmixed \t here\n";
        assert_eq!(
            render(content, 8, 10),
            "  leading\ntrailing  \n\tmixed \t here\n"
        );
    }

    #[test]
    fn test_raw_block_verbatim() {
        assert_eq!(render(b"partial", 16, 10), "partial");
        assert_eq!(render(b"", 16, 10), "");
    }

    #[test]
    fn test_change_marker() {
        let mut printer = TailPrinter::new(Vec::new());
        printer.print_change_marker().unwrap();
        printer.print(&Tail::Raw(b"x\n".to_vec())).unwrap();
        assert_eq!(printer.into_inner(), b"\nFile has been modified\nx\n");
    }
}
