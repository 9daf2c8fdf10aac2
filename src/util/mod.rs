use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Incomplete catalog data: {object} references missing {missing}")]
    IncompleteCatalogData { object: String, missing: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl SchemaError {
    pub fn incomplete(object: impl Into<String>, missing: impl Into<String>) -> Self {
        SchemaError::IncompleteCatalogData {
            object: object.into(),
            missing: missing.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Masks the password of a connection URL, both in the authority part and in
/// `password=` query parameters.
pub fn sanitize_url(url: &str) -> String {
    let authority = Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*://)(?P<user>[^:@/]*):[^@/]*@")
        .unwrap();
    let masked = authority.replace(url, "${scheme}${user}:***@");

    let query = Regex::new(r"(?i)(?P<key>[?&]password=)[^&]*").unwrap();
    query.replace_all(&masked, "${key}***").to_string()
}

/// Removes the raw password of `url` from a driver error message.
pub fn sanitize_connection_error(url: &str, message: &str) -> String {
    match extract_password(url) {
        Some(password) if !password.is_empty() => message.replace(&password, "***"),
        _ => message.to_string(),
    }
}

fn extract_password(url: &str) -> Option<String> {
    let authority = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^:@/]*:(?P<pass>[^@/]*)@").unwrap();
    if let Some(caps) = authority.captures(url) {
        return caps.name("pass").map(|m| m.as_str().to_string());
    }

    let query = Regex::new(r"(?i)[?&]password=(?P<pass>[^&]*)").unwrap();
    query
        .captures(url)
        .and_then(|caps| caps.name("pass").map(|m| m.as_str().to_string()))
}
