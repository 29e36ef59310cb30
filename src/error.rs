//! Error types.
//!
//! - `FitError` is the library taxonomy returned by fitting, simulation and
//!   sample parsing. Every variant is terminal for the call that raised it.
//! - `AppError` is what the binary reports: a message plus a process exit code.

use thiserror::Error;

/// Errors raised by the fitting / simulation core.
#[derive(Error, Debug)]
pub enum FitError {
    /// Fewer samples than free parameters.
    #[error("Insufficient data: {samples} sample(s) for {params} parameter(s).")]
    InsufficientData { samples: usize, params: usize },

    /// The iteration cap was reached before any convergence test passed.
    #[error("Fit did not converge after {iterations} iteration(s) (residual {residual:.6e}).")]
    DidNotConverge { iterations: usize, residual: f64 },

    /// A state component became non-finite or exceeded the divergence bound.
    #[error("Integration diverged at t={time}: |x|={magnitude:.6e}.")]
    IntegrationDiverged { time: f64, magnitude: f64 },

    /// A sample row could not be parsed.
    #[error("Malformed sample on line {line}: {message}")]
    MalformedSample { line: usize, message: String },

    /// Arguments that no computation can start from.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

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

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::MalformedSample { .. } | FitError::InvalidInput(_) | FitError::Io(_) => 2,
            FitError::InsufficientData { .. } => 3,
            FitError::DidNotConverge { .. } | FitError::IntegrationDiverged { .. } => 4,
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
    fn fit_errors_map_to_exit_codes() {
        let e: AppError = FitError::InsufficientData { samples: 1, params: 2 }.into();
        assert_eq!(e.exit_code(), 3);

        let e: AppError = FitError::DidNotConverge { iterations: 5, residual: 1.0 }.into();
        assert_eq!(e.exit_code(), 4);

        let e: AppError = FitError::MalformedSample { line: 3, message: "bad".into() }.into();
        assert_eq!(e.exit_code(), 2);
        assert!(e.to_string().contains("line 3"));
    }
}
