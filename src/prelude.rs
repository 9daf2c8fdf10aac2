//! Convenient re-exports for common pgshape usage.
//!
//! # Example
//!
//! ```no_run
//! use pgshape::prelude::*;
//!
//! let result = extract_blocking(ExtractOptions::new("postgres://localhost/mydb")).unwrap();
//! println!("{} top-level sections", result.sections.len());
//! ```

// Async functions
pub use crate::api::{extract, extract_to};

// Blocking functions
pub use crate::api::{extract_blocking, extract_to_blocking};

// Offline pipeline
pub use crate::api::extract_snapshot;

// Options, results and errors
pub use crate::api::{Error, ExtractOptions, ExtractResult};

// Core types
pub use crate::filter::{FilterSpec, ObjectCategory};
pub use crate::model::Database;
pub use crate::output::OutputTarget;
pub use crate::pg::CatalogSnapshot;
pub use crate::project::Section;
