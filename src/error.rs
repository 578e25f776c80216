//! Error handling for the Pokémon catalog
//!
//! One taxonomy covers the store, the upsert service, the score calculator
//! and the upstream lookup. The HTTP layer maps each variant to a status code
//! via [`CatalogError::http_status`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Main error type for catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("A Pokemon with {} {value} already exists.", duplicate_label(.field))]
    DuplicateKey { field: &'static str, value: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid shape for '{field}': {reason}")]
    InvalidShape { field: &'static str, reason: String },

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("missing field '{0}' in pokemon record")]
    MissingField(&'static str),

    #[error("upstream provider error: {0}")]
    UpstreamError(String),

    #[error("unexpected upstream shape: {0}")]
    UnexpectedShape(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found_pokemon(pokemon_id: i32) -> Self {
        Self::NotFound(format!("pokemon with pokemon_id {}", pokemon_id))
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::DuplicateKey { .. } => 400,
            Self::NotFound(_) => 404,
            Self::InvalidShape { .. } => 400,
            Self::Validation(_) => 400,
            Self::MissingField(_) => 500,
            Self::UpstreamError(_) => 502,
            Self::UnexpectedShape(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Client errors rendered as a field -> messages map.
    ///
    /// Returns `None` for errors that carry no per-field detail.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::DuplicateKey { field, .. } => {
                let mut errors = FieldErrors::new();
                errors.add(field, self.to_string());
                Some(errors)
            }
            Self::InvalidShape { field, reason } => {
                let mut errors = FieldErrors::new();
                errors.add(field, reason.clone());
                Some(errors)
            }
            Self::Validation(errors) => Some(errors.clone()),
            _ => None,
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e).context("database error"))
    }
}

fn duplicate_label(field: &str) -> &str {
    match field {
        "pokemon_id" => "Id",
        other => other,
    }
}

/// Result type alias for convenience
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Field-keyed validation messages, collected before any write happens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn required(&mut self, field: &str) {
        self.add(field, "This field is required.");
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// `Ok(value)` when nothing was collected, otherwise a `Validation` error.
    pub fn into_result<T>(self, value: T) -> CatalogResult<T> {
        if self.has_errors() {
            Err(CatalogError::Validation(self))
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, messages.join(" "))?;
            first = false;
        }
        Ok(())
    }
}
