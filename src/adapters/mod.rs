//! Sample sources
//!
//! A [`SampleSource`] turns an export file name into raw [`Sample`]s restricted
//! to a [`DateWindow`]. The pipeline only talks to this trait, so analyses can
//! run against a directory of CSV exports or against in-memory fixtures.

mod csv_export;
mod memory;

pub use csv_export::{parse_samples, parse_timestamp, parse_value, CsvDirectorySource};
pub use memory::MemorySource;

use crate::config::DateWindow;
use crate::error::ComputeError;
use crate::types::Sample;

/// Trait for sample sources
pub trait SampleSource {
    /// Load all samples of `file` that fall inside `window`.
    ///
    /// A file that does not exist yields an empty list; an unreadable or
    /// malformed file is an error.
    fn load(&self, file: &str, window: &DateWindow) -> Result<Vec<Sample>, ComputeError>;

    /// Whether `file` is available at all
    fn exists(&self, file: &str) -> bool;
}
