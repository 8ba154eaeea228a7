use thiserror::Error;

/// 子行程未正常結束時的退出資訊
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// 轉換為 shell 慣例的退出碼 (訊號終止 = 128 + signal)
    pub fn as_exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

impl std::fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit status {}", code),
            (None, Some(signal)) => write!(f, "terminated by signal {}", signal),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GeoOwlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Environment creation failed ({command}): {status}")]
    EnvironmentCreationError { command: String, status: ExitInfo },

    #[error("Dependency installation failed ({command}): {status}")]
    DependencyInstallError { command: String, status: ExitInfo },

    #[error("Server exited abnormally ({command}): {status}")]
    LaunchError { command: String, status: ExitInfo },

    #[error("Command not found: {program}")]
    CommandNotFound { program: String },

    #[error("Input error on line {line}: {message}")]
    InputError { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, GeoOwlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Environment,
    Dependencies,
    Server,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GeoOwlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GeoOwlError::ConfigError { .. }
            | GeoOwlError::ConfigValidationError { .. }
            | GeoOwlError::InvalidConfigValueError { .. }
            | GeoOwlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            GeoOwlError::EnvironmentCreationError { .. } => ErrorCategory::Environment,
            GeoOwlError::DependencyInstallError { .. } => ErrorCategory::Dependencies,
            GeoOwlError::LaunchError { .. } | GeoOwlError::CommandNotFound { .. } => {
                ErrorCategory::Server
            }
            GeoOwlError::CsvError(_)
            | GeoOwlError::SerializationError(_)
            | GeoOwlError::InputError { .. } => ErrorCategory::Input,
            GeoOwlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Server | ErrorCategory::Dependencies => ErrorSeverity::High,
            ErrorCategory::Environment | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 行程退出碼：步驟失敗時沿用底層指令的狀態
    pub fn exit_code(&self) -> i32 {
        match self {
            GeoOwlError::EnvironmentCreationError { status, .. }
            | GeoOwlError::DependencyInstallError { status, .. }
            | GeoOwlError::LaunchError { status, .. } => match status.as_exit_code() {
                0 => 1,
                code => code,
            },
            GeoOwlError::CommandNotFound { .. } => 127,
            _ => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            GeoOwlError::EnvironmentCreationError { .. } => {
                "Check that a Python 3 interpreter with the venv module is installed".to_string()
            }
            GeoOwlError::DependencyInstallError { .. } => {
                "Check the dependency manifest and network access, then rerun with the install flag"
                    .to_string()
            }
            GeoOwlError::LaunchError { .. } => {
                "Inspect the server output above; the application entry file may be missing or failing"
                    .to_string()
            }
            GeoOwlError::CommandNotFound { program } => format!(
                "Install '{}' or set INSTALL_DEPS=1 to install dependencies into the environment",
                program
            ),
            GeoOwlError::ConfigError { .. }
            | GeoOwlError::ConfigValidationError { .. }
            | GeoOwlError::InvalidConfigValueError { .. }
            | GeoOwlError::MissingConfigError { .. } => {
                "Review geo-owl.toml and the command-line options".to_string()
            }
            GeoOwlError::CsvError(_) | GeoOwlError::InputError { .. } => {
                "Fix the offending input line and try again".to_string()
            }
            GeoOwlError::SerializationError(_) => "Report this as a bug".to_string(),
            GeoOwlError::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GeoOwlError::EnvironmentCreationError { status, .. } => {
                format!("Could not create the virtual environment ({})", status)
            }
            GeoOwlError::DependencyInstallError { status, .. } => {
                format!("Dependency installation failed ({})", status)
            }
            GeoOwlError::LaunchError { status, .. } => {
                format!("The dashboard server stopped with {}", status)
            }
            GeoOwlError::CommandNotFound { program } => {
                format!("'{}' is not installed or not on PATH", program)
            }
            other => other.to_string(),
        }
    }
}
