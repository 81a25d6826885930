// ⚠️ Error taxonomy for the planner
// Data-integrity failures abort the run, layout misuse is a programming error,
// everything else is configuration or I/O.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    // ========================================================================
    // FATAL DATA ERRORS
    // ========================================================================
    /// Apportionment ratios of one account do not add up to 1 across units
    #[error(
        "apportionment ratios for account '{account}' sum to {total:.5}; set them so they sum to exactly 1"
    )]
    RatioMismatch { account: String, total: f64 },

    // ========================================================================
    // STRUCTURAL ERRORS (layout engine misuse)
    // ========================================================================
    #[error("sub-table '{name}' is already defined in this table")]
    DuplicateSubTable { name: String },

    #[error("sub-table #{index} does not belong to this table ({count} defined)")]
    UnknownSubTable { index: usize, count: usize },

    #[error("row {row} is outside the declared extent of {extent} rows")]
    RowOutOfRange { row: usize, extent: usize },

    #[error("column {column} is outside the header width of {width} columns")]
    ColumnOutOfRange { column: usize, width: usize },

    // ========================================================================
    // CONFIGURATION / INPUT ERRORS
    // ========================================================================
    #[error("business unit '{unit}' has no registered definitions")]
    UnknownUnit { unit: String },

    #[error("invalid period token: '{token}'")]
    InvalidPeriod { token: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),
}

impl PlannerError {
    pub fn config(message: impl Into<String>) -> Self {
        PlannerError::Config {
            message: message.into(),
        }
    }

    /// Errors caused by the input data itself rather than by the program
    pub fn is_fatal_data_error(&self) -> bool {
        matches!(self, PlannerError::RatioMismatch { .. })
    }

    /// Errors that indicate the layout engine was driven incorrectly
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PlannerError::DuplicateSubTable { .. }
                | PlannerError::UnknownSubTable { .. }
                | PlannerError::RowOutOfRange { .. }
                | PlannerError::ColumnOutOfRange { .. }
        )
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal_data_error() {
            1
        } else if self.is_structural() {
            3
        } else {
            2
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
