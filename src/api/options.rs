use super::Error;
use crate::filter::{FilterSpec, ObjectCategory};
use crate::redact::RedactOptions;

/// Options for extracting a database's schema.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Database connection URL
    pub database_url: String,
    /// Object categories left out of the document
    pub excluded_categories: Vec<ObjectCategory>,
    /// Schema name patterns to include (empty means all)
    pub include_schemas: Vec<String>,
    /// Schema name patterns to exclude
    pub exclude_schemas: Vec<String>,
    /// Table name patterns to include (empty means all)
    pub include_tables: Vec<String>,
    /// Table name patterns to exclude
    pub exclude_tables: Vec<String>,
    /// Omit object owners
    pub no_owner: bool,
    /// Omit access privileges
    pub no_privileges: bool,
    /// Read the catalogs over several connections sharing one snapshot
    pub parallel: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            excluded_categories: Vec::new(),
            include_schemas: Vec::new(),
            exclude_schemas: Vec::new(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            no_owner: false,
            no_privileges: false,
            parallel: true,
        }
    }
}

impl ExtractOptions {
    /// Create new extract options with required fields.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Leave a whole object category out.
    pub fn without_category(mut self, category: ObjectCategory) -> Self {
        if !self.excluded_categories.contains(&category) {
            self.excluded_categories.push(category);
        }
        self
    }

    /// Set schema include/exclude patterns.
    pub fn with_schemas(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include_schemas = include;
        self.exclude_schemas = exclude;
        self
    }

    /// Set table include/exclude patterns.
    pub fn with_tables(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include_tables = include;
        self.exclude_tables = exclude;
        self
    }

    pub fn without_owner(mut self) -> Self {
        self.no_owner = true;
        self
    }

    pub fn without_privileges(mut self) -> Self {
        self.no_privileges = true;
        self
    }

    /// Read every catalog over a single connection.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Compiles the name patterns. Fails on the first malformed one.
    pub fn filter_spec(&self) -> Result<FilterSpec, Error> {
        FilterSpec::new(
            self.excluded_categories.iter().copied(),
            &self.include_schemas,
            &self.exclude_schemas,
            &self.include_tables,
            &self.exclude_tables,
        )
        .map_err(|e| match e {
            crate::util::SchemaError::ConfigError(message) => Error::invalid_filter(message),
            other => other.into(),
        })
    }

    pub fn redact_options(&self) -> RedactOptions {
        RedactOptions {
            no_owner: self.no_owner,
            no_privileges: self.no_privileges,
        }
    }
}
