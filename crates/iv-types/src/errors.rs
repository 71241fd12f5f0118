use thiserror::Error;

/// Main error type for the InvML system
#[derive(Error, Debug)]
pub enum IvError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IvError {
    /// True for faults caused by the caller's input rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        match self {
            IvError::Validation(_) | IvError::Data(_) | IvError::Serialization(_) => true,
            IvError::Model(ModelError::UnknownModel { .. }) => true,
            IvError::Search(SearchError::NoVariants | SearchError::NoModelsOptimized) => true,
            _ => false,
        }
    }
}

/// Dataset and preprocessing errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Non-numeric value {value:?} in column {column} at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Dataset is empty")]
    Empty,

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Scaler used before fit")]
    ScalerNotFitted,

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },
}

/// Regressor fitting and prediction errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model not fitted: {model}")]
    NotFitted { model: String },

    #[error("Unknown model: {name}")]
    UnknownModel { name: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Singular system while fitting {model}")]
    Singular { model: String },

    #[error("{model} supports at most {limit} training samples, got {samples}")]
    TooManySamples {
        model: String,
        samples: usize,
        limit: usize,
    },

    #[error("Fitting {model} failed: {message}")]
    FitFailed { model: String, message: String },
}

/// Search and coordination errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Optimizer run with seed {seed} failed: {message}")]
    WorkerFailed { seed: u64, message: String },

    #[error("Optimizer run with seed {seed} panicked")]
    WorkerPanicked { seed: u64 },

    #[error("Search for {model} produced no solutions")]
    EmptyPool { model: String },

    #[error("No predictor variants were requested")]
    NoVariants,

    #[error("No models were optimized.")]
    NoModelsOptimized,
}

/// Result type alias for InvML operations
pub type IvResult<T> = Result<T, IvError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::IvError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::IvError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::IvError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::NonNumeric {
            column: "density".to_string(),
            row: 3,
            value: "n/a".to_string(),
        };

        assert!(error.to_string().contains("density"));
        assert!(error.to_string().contains("row 3"));
        assert!(error.to_string().contains("n/a"));
    }

    #[test]
    fn test_error_conversion() {
        let search_error = SearchError::WorkerPanicked { seed: 7 };
        let iv_error: IvError = search_error.into();

        match iv_error {
            IvError::Search(SearchError::WorkerPanicked { seed }) => assert_eq!(seed, 7),
            _ => panic!("Expected Search error"),
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(validation_error!("bad {}", 1).is_client_error());
        assert!(IvError::from(DataError::Empty).is_client_error());
        assert!(IvError::from(SearchError::NoModelsOptimized).is_client_error());
        assert!(!IvError::from(SearchError::WorkerPanicked { seed: 1 }).is_client_error());
        assert!(!internal_error!("boom").is_client_error());
    }

    #[test]
    fn test_macros() {
        let _validation_err = validation_error!("Invalid value: {}", 42);
        let _internal_err = internal_error!("Something went wrong");
        let config_err = config_error!("Missing required field: {}", "INVML_ADDR");
        assert!(config_err.to_string().starts_with("Configuration error"));
    }
}
