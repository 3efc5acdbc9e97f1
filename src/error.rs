//! Application error type.
//!
//! Every fallible operation outside the fit engine returns `AppError`. The error
//! carries the process exit code so `main` can stay a one-liner.

/// Input file could not be read, parsed, or written.
pub const EXIT_IO: u8 = 2;
/// The data does not satisfy a precondition (empty cohort, non-finite value).
pub const EXIT_DATA: u8 = 3;
/// Rendering or numeric post-processing failed.
pub const EXIT_RENDER: u8 = 4;

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

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(EXIT_RENDER, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
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
    fn helpers_set_exit_codes() {
        assert_eq!(AppError::io("x").exit_code(), EXIT_IO);
        assert_eq!(AppError::data("x").exit_code(), EXIT_DATA);
        assert_eq!(AppError::render("x").exit_code(), EXIT_RENDER);
        assert_eq!(AppError::data("empty cohort").to_string(), "empty cohort");
    }
}
