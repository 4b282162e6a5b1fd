//! In-memory sample source

use std::collections::HashMap;

use crate::config::DateWindow;
use crate::error::ComputeError;
use crate::types::Sample;

use super::SampleSource;

/// Samples keyed by export file name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<Sample>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the samples of one file, replacing any previous content
    pub fn insert(&mut self, file: impl Into<String>, samples: Vec<Sample>) {
        self.files.insert(file.into(), samples);
    }

    pub fn with_file(mut self, file: impl Into<String>, samples: Vec<Sample>) -> Self {
        self.insert(file, samples);
        self
    }
}

impl SampleSource for MemorySource {
    fn load(&self, file: &str, window: &DateWindow) -> Result<Vec<Sample>, ComputeError> {
        Ok(self
            .files
            .get(file)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| window.contains(s.timestamp.date()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn exists(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }
}
