use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Conflict: {message}")]
    ConflictError { message: String },

    #[error("{entity} {id} not found")]
    NotFoundError { entity: &'static str, id: String },

    #[error("Invalid input for '{field}': {message}")]
    InputError { field: String, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Backend unreachable: {message}")]
    TransportError { message: String },

    #[error("Backend responded with status {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Input,
    Transport,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFoundError {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::ValidationError {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::ConflictError {
            message: message.into(),
        }
    }

    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::InputError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        LedgerError::TransportError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::ValidationError { .. } => ErrorCategory::Validation,
            LedgerError::ConflictError { .. } => ErrorCategory::Conflict,
            LedgerError::NotFoundError { .. } => ErrorCategory::NotFound,
            LedgerError::InputError { .. } => ErrorCategory::Input,
            LedgerError::ApiError(_)
            | LedgerError::TransportError { .. }
            | LedgerError::BackendError { .. } => ErrorCategory::Transport,
            LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::CsvError(_) => ErrorCategory::Data,
            LedgerError::ConfigError { .. }
            | LedgerError::ConfigValidationError { .. }
            | LedgerError::MissingConfigError { .. }
            | LedgerError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict | ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Validation | ErrorCategory::NotFound | ErrorCategory::Input => {
                ErrorSeverity::High
            }
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Conflicts and transport failures can succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Conflict | ErrorCategory::Transport
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Pick a pending or absent class from this enrollment",
            ErrorCategory::Conflict => "Reload the available sessions and choose another one",
            ErrorCategory::NotFound => "Check the identifier and try again",
            ErrorCategory::Input => "Correct the highlighted field and resubmit",
            ErrorCategory::Transport => "Check the backend connection and retry",
            ErrorCategory::Data => "Check file permissions and the backend payload format",
            ErrorCategory::Configuration => "Review the configuration file and CLI flags",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LedgerError::ValidationError { message } => format!("Not allowed: {}", message),
            LedgerError::ConflictError { message } => {
                format!("The session is no longer available: {}", message)
            }
            LedgerError::NotFoundError { entity, id } => {
                format!("Could not find {} {}", entity, id)
            }
            LedgerError::InputError { field, message } => format!("{}: {}", field, message),
            LedgerError::ApiError(_)
            | LedgerError::TransportError { .. }
            | LedgerError::BackendError { .. } => {
                "The school backend could not be reached".to_string()
            }
            other => other.to_string(),
        }
    }
}
