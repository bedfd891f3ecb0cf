use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum HamError {
    #[error("{0}")]
    Error(String),
    #[error("failed to read model specification: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model specification: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },
    #[error("{solver} did not converge after {iterations} iterations (residual {residual:e}, tolerance {tolerance:e})")]
    ConvergenceFailure {
        solver: &'static str,
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },
    #[error("no equilibrium bracketed on [{lower}, {upper}]: excess asset supply is {excess_lower:.6} at the lower end and {excess_upper:.6} at the upper end")]
    BracketingFailure {
        lower: f64,
        upper: f64,
        excess_lower: f64,
        excess_upper: f64,
    },
}

/// Convenience type for `Result<T, HamError>`.
pub type HamResult<T> = Result<T, HamError>;
