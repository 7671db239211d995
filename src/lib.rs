pub mod cli;
pub mod listing;
pub mod report;
pub mod scanner;
pub mod session;
pub mod types;

pub use scanner::{ScanOptions, Scanner};
pub use types::{ScanResult, ScanTarget};
