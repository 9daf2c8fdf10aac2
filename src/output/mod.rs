//! Document encoder: turns projected mappings into YAML text and writes it
//! to standard output, a single file, or one file per section.

use crate::project::Section;
use crate::util::{Result, SchemaError};
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_DIRECTORY: &str = "metadata";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
    Directory(PathBuf),
}

impl OutputTarget {
    /// Resolves the output flags. A single output file and multiple-files
    /// mode cannot be combined.
    pub fn from_args(
        output: Option<PathBuf>,
        multiple_files: bool,
        directory: Option<PathBuf>,
    ) -> Result<Self> {
        match (output, multiple_files) {
            (Some(path), true) => Err(SchemaError::ConfigError(format!(
                "Cannot write to {} in multiple-files mode",
                path.display()
            ))),
            (Some(path), false) => Ok(OutputTarget::File(path)),
            (None, true) => Ok(OutputTarget::Directory(
                directory.unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY)),
            )),
            (None, false) => Ok(OutputTarget::Stdout),
        }
    }
}

/// Encodes a mapping as YAML, block style, keys in mapping order.
pub fn render(mapping: &Mapping) -> Result<String> {
    if mapping.is_empty() {
        return Ok(String::new());
    }
    serde_yaml::to_string(mapping)
        .map_err(|e| SchemaError::OutputError(format!("Failed to encode YAML: {e}")))
}

/// Encodes the sections back to back, exactly as they appear in the
/// single-document output.
pub fn render_sections(sections: &[(Section, Mapping)]) -> Result<String> {
    let mut document = Mapping::new();
    for (_, section) in sections {
        document.extend(section.clone());
    }
    render(&document)
}

/// File name a section is written to in multiple-files mode.
pub fn file_name(section: &Section) -> String {
    match section {
        Section::Schema(name) => format!("schema.{}.yaml", sanitize_file_stem(name)),
        Section::Extensions => "extension.yaml".to_string(),
        Section::Languages => "language.yaml".to_string(),
        Section::Casts => "cast.yaml".to_string(),
        Section::ForeignDataWrappers => "foreign_data_wrapper.yaml".to_string(),
        Section::EventTriggers => "event_trigger.yaml".to_string(),
    }
}

/// Keeps letters, digits, `_` and `-`; anything else becomes `_`.
fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn is_generated_file(name: &str) -> bool {
    const CATEGORY_FILES: [&str; 5] = [
        "extension.yaml",
        "language.yaml",
        "cast.yaml",
        "foreign_data_wrapper.yaml",
        "event_trigger.yaml",
    ];
    CATEGORY_FILES.contains(&name) || (name.starts_with("schema.") && name.ends_with(".yaml"))
}

/// Writes the sections to `target`. Returns the files written; empty for
/// standard output.
pub fn write_document(target: &OutputTarget, sections: &[(Section, Mapping)]) -> Result<Vec<PathBuf>> {
    match target {
        OutputTarget::Stdout => {
            let text = render_sections(sections)?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| SchemaError::OutputError(format!("Failed to write to stdout: {e}")))?;
            Ok(Vec::new())
        }
        OutputTarget::File(path) => {
            let text = render_sections(sections)?;
            write_file(path, &text)?;
            info!(path = %path.display(), "wrote document");
            Ok(vec![path.clone()])
        }
        OutputTarget::Directory(dir) => write_directory(dir, sections),
    }
}

fn write_directory(dir: &Path, sections: &[(Section, Mapping)]) -> Result<Vec<PathBuf>> {
    let mut files: BTreeMap<String, &Section> = BTreeMap::new();
    for (section, _) in sections {
        let name = file_name(section);
        if let Some(previous) = files.insert(name.clone(), section) {
            return Err(SchemaError::OutputError(format!(
                "{previous:?} and {section:?} both map to file {name}"
            )));
        }
    }

    fs::create_dir_all(dir).map_err(|e| {
        SchemaError::OutputError(format!("Failed to create directory {}: {e}", dir.display()))
    })?;

    remove_stale_files(dir, &files)?;

    let mut written = Vec::with_capacity(sections.len());
    for (section, mapping) in sections {
        let path = dir.join(file_name(section));
        write_file(&path, &render(mapping)?)?;
        debug!(path = %path.display(), "wrote section");
        written.push(path);
    }
    info!(directory = %dir.display(), files = written.len(), "wrote sections");
    Ok(written)
}

/// Drops files left by an earlier run for objects that no longer exist, so
/// the directory always reassembles into the current document.
fn remove_stale_files(dir: &Path, current: &BTreeMap<String, &Section>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        SchemaError::OutputError(format!("Failed to read directory {}: {e}", dir.display()))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| SchemaError::OutputError(e.to_string()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_generated_file(&name) && !current.contains_key(&name) {
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| {
                SchemaError::OutputError(format!("Failed to remove {}: {e}", path.display()))
            })?;
            info!(path = %path.display(), "removed stale file");
        }
    }
    Ok(())
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .map_err(|e| SchemaError::OutputError(format!("Failed to write {}: {e}", path.display())))
}
