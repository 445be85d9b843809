use mapstyle_expression::{CompileErrors, EvaluationError, FunctionError};
use thiserror::Error;

/// Everything that can go wrong between reading input and printing a result.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expression is invalid:\n{0}")]
    Compile(#[from] CompileErrors),

    #[error("Legacy function is invalid: {0}")]
    Function(FunctionError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

// Compile errors inside a converted function are reported like any other expression's.
impl From<FunctionError> for CliError {
    fn from(e: FunctionError) -> Self {
        match e {
            FunctionError::Compile(errors) => CliError::Compile(errors),
            other => CliError::Function(other),
        }
    }
}
