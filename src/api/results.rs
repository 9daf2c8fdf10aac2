use crate::model::Database;
use crate::project::Section;
use serde_yaml::Mapping;

/// Result of a schema extraction.
#[derive(Debug, Clone)]
pub struct ExtractResult {
    /// Filtered and redacted object model the document was projected from
    pub database: Database,
    /// Top-level sections in document order
    pub sections: Vec<(Section, Mapping)>,
    /// Encoded YAML document
    pub yaml: String,
    /// SHA-256 of the encoded document
    pub fingerprint: String,
}

impl ExtractResult {
    /// The whole document as one mapping.
    pub fn document(&self) -> Mapping {
        let mut document = Mapping::new();
        for (_, section) in &self.sections {
            document.extend(section.clone());
        }
        document
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
