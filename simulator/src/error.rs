//! Error handling for the Vineyard Harvest Simulator
//!
//! The simulation itself cannot fail once its inputs are valid; every error
//! here comes from configuration or from writing and reading the tables.

use serde::Serialize;
use shared::HarvestRowError;
use thiserror::Error;

/// Simulator error types
#[derive(Error, Debug)]
pub enum SimError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    // Table errors
    #[error("Invalid harvest row: {0}")]
    InvalidRow(#[from] HarvestRowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine readable error summary, logged when a run aborts
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl SimError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        SimError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SimError::Configuration(_) => "CONFIGURATION_ERROR",
            SimError::InvalidConfig { .. } => "INVALID_CONFIGURATION",
            SimError::ConfigLoad(_) => "CONFIGURATION_LOAD_ERROR",
            SimError::InvalidRow(_) => "INVALID_HARVEST_ROW",
            SimError::Csv(_) => "CSV_ERROR",
            SimError::Json(_) => "JSON_ERROR",
            SimError::Io(_) => "IO_ERROR",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::Configuration(_) | SimError::InvalidConfig { .. } | SimError::ConfigLoad(_)
        )
    }

    pub fn detail(&self) -> ErrorDetail {
        let field = match self {
            SimError::InvalidConfig { field, .. } => Some(field.clone()),
            _ => None,
        };
        ErrorDetail {
            code: self.code(),
            message: self.to_string(),
            field,
        }
    }
}

impl From<validator::ValidationErrors> for SimError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match first_field_error(&errors, "") {
            Some((field, message)) => SimError::invalid(field, message),
            None => SimError::Configuration(errors.to_string()),
        }
    }
}

/// First failing field in name order, with its dotted path
fn first_field_error(errors: &validator::ValidationErrors, prefix: &str) -> Option<(String, String)> {
    use validator::ValidationErrorsKind;

    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().find_map(|(name, kind)| {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "value out of range".to_string());
                Some((path, message))
            }
            ValidationErrorsKind::Struct(nested) => first_field_error(nested, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, nested)| first_field_error(nested, &format!("{}[{}]", path, index))),
        }
    })
}

/// Result type alias for simulator operations
pub type SimResult<T> = Result<T, SimError>;
