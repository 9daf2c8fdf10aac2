//! pgshape - PostgreSQL schema extraction library.
//!
//! This crate reads the system catalogs of a live PostgreSQL database and
//! describes its user-defined objects as a deterministic YAML document,
//! suitable for committing to version control and diffing.
//!
//! # Quick Start
//!
//! Use the high-level API via the [`api`] module or [`prelude`]:
//!
//! ```no_run
//! use pgshape::prelude::*;
//!
//! let result = extract_blocking(
//!     ExtractOptions::new("postgres://localhost/mydb").without_privileges(),
//! )
//! .unwrap();
//!
//! print!("{}", result.yaml);
//! ```
//!
//! # Modules
//!
//! - [`api`] - High-level extraction API
//! - [`prelude`] - Convenient re-exports for common usage
//! - [`pg`] - Catalog queries over a consistent snapshot
//! - [`build`] - Resolves catalog rows into the object model
//! - [`model`] - Object model types (Schema, Table, Column, etc.)
//! - [`filter`] - Object filtering by category and name
//! - [`redact`] - Owner and privilege removal
//! - [`project`] - Ordered YAML mapping projection
//! - [`output`] - Document encoding and file layout

pub mod api;
pub mod build;
pub mod filter;
pub mod model;
pub mod output;
pub mod pg;
pub mod prelude;
pub mod project;
pub mod redact;
pub mod util;
