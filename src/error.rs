use std::path::Path;

use polars::prelude::PolarsError;

use crate::domain::{SourceKind, Year};

/// Failures raised while loading sources or building the panel.
///
/// Everything here is fatal for the build that produced it: there are no
/// retries and no partial panels.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PanelError {
    /// A table is missing an expected column, or its shape breaks a key invariant.
    #[error("schema error in {table}: {message}")]
    Schema { table: String, message: String },

    /// Not enough years shared by every source to pick a window.
    #[error("insufficient data: need at least {needed} common years, found {}: {years:?}", .years.len())]
    InsufficientData { needed: usize, years: Vec<Year> },

    /// The raw source could not be read at all.
    #[error("failed to read {kind} source ({origin}): {message}")]
    Read {
        kind: SourceKind,
        origin: String,
        message: String,
    },
}

impl PanelError {
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn read(kind: SourceKind, origin: &Path, message: impl Into<String>) -> Self {
        Self::Read {
            kind,
            origin: origin.display().to_string(),
            message: message.into(),
        }
    }

    /// A polars operation on `table` failed (missing column, dtype mismatch, ...).
    pub fn frame(table: impl Into<String>, err: PolarsError) -> Self {
        Self::Schema {
            table: table.into(),
            message: err.to_string(),
        }
    }
}

/// Application-level error carrying the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PanelError> for AppError {
    fn from(err: PanelError) -> Self {
        let exit_code = match &err {
            PanelError::Read { origin, .. } if origin == crate::data::fred::FRED_ORIGIN => 4,
            PanelError::Read { .. } | PanelError::Schema { .. } => 2,
            PanelError::InsufficientData { .. } => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let schema: AppError = PanelError::schema("income", "missing column `year`").into();
        assert_eq!(schema.exit_code(), 2);

        let short: AppError = PanelError::InsufficientData {
            needed: 5,
            years: vec![2020, 2021],
        }
        .into();
        assert_eq!(short.exit_code(), 3);
        assert!(short.to_string().contains("[2020, 2021]"));

        let fred: AppError = PanelError::read(
            SourceKind::MortgageRates,
            Path::new(crate::data::fred::FRED_ORIGIN),
            "status 500",
        )
        .into();
        assert_eq!(fred.exit_code(), 4);
    }
}
