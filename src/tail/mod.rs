//! Locating and printing the last lines of a file without reading it whole.

pub mod printer;
pub mod reader;
pub mod scanner;

pub use printer::TailPrinter;
pub use scanner::ReverseLineScanner;
