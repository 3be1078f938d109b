use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use log::debug;

use super::error::ClassifierError;

/// Ordered class names, one per model output index.
///
/// Loaded from a plain-text file with one label per line. Trailing whitespace
/// is trimmed and underscores become spaces, so `golden_retriever` is reported
/// as `golden retriever`. Line order defines the class index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDictionary {
    labels: Vec<String>,
}

impl LabelDictionary {
    /// Reads a label dictionary from a file on disk.
    ///
    /// # Errors
    /// - `ModelLoadError` if the file is missing, unreadable or not valid UTF-8
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClassifierError::ModelLoadError(format!(
                "Failed to open label file {}: {}",
                path.display(),
                e
            ))
        })?;
        let labels = Self::from_reader(BufReader::new(file))?;
        debug!("Loaded {} labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    /// Reads a label dictionary from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ClassifierError> {
        let labels = reader
            .lines()
            .map(|line| {
                line.map(|l| Self::clean_label(&l)).map_err(|e| {
                    ClassifierError::ModelLoadError(format!("Failed to read label file: {}", e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { labels })
    }

    /// Parses a label dictionary held in memory.
    pub fn parse(text: &str) -> Self {
        Self {
            labels: text.lines().map(Self::clean_label).collect(),
        }
    }

    fn clean_label(line: &str) -> String {
        line.trim_end().replace('_', " ")
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the label for an output index, if the index is in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Returns the class names in alphabetical order, for listing.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<S> for LabelDictionary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}
