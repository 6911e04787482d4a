//! CLI error types.

use std::fmt;

use terraforge::ValidationError;

/// Errors surfaced to the command-line user.
#[derive(Debug)]
pub enum CliError {
    /// Coordinate arguments could not be parsed.
    InvalidCoordinates(String),

    /// The submission was rejected before a job started.
    Validation(ValidationError),

    /// The job ran and ended in the error state.
    JobFailed(String),

    /// The HTTP client could not be constructed.
    Client(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidCoordinates(msg) => {
                write!(f, "Invalid coordinates: {}", msg)
            }
            CliError::Validation(e) => {
                write!(f, "Submission rejected: {}", e)
            }
            CliError::JobFailed(msg) => {
                write!(f, "Terrain generation failed: {}", msg)
            }
            CliError::Client(msg) => {
                write!(f, "HTTP client error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(e: ValidationError) -> Self {
        CliError::Validation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::InvalidCoordinates("expected lat,lng".to_string());
        assert!(err.to_string().contains("Invalid coordinates"));

        let err: CliError = ValidationError::TooFewPoints(2).into();
        assert!(err.to_string().contains("Submission rejected"));
    }
}
