use crate::util::SchemaError;
use thiserror::Error;

/// Structured error type for pgshape library operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Introspection failed: {message}")]
    Introspection { message: String },

    #[error("Incomplete catalog data: {object} references missing {missing}")]
    IncompleteCatalog { object: String, missing: String },

    #[error("Invalid filter pattern: {pattern}")]
    InvalidFilter { pattern: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Output failed: {message}")]
    Output { message: String },

    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl Error {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection {
            message: message.into(),
        }
    }

    pub fn invalid_filter(pattern: impl Into<String>) -> Self {
        Self::InvalidFilter {
            pattern: pattern.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::DatabaseError(message) => Self::introspection(message),
            SchemaError::IncompleteCatalogData { object, missing } => {
                Self::IncompleteCatalog { object, missing }
            }
            SchemaError::ConfigError(message) => Self::configuration(message),
            SchemaError::OutputError(message) => Self::output(message),
        }
    }
}
