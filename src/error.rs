use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Dataset text has no header row")]
    MissingHeader,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Query execution error: {0}")]
    ExecutionError(String),

    #[error("No dataset loaded")]
    NoDataset,

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::MissingHeader;
        assert_eq!(err.to_string(), "Dataset text has no header row");

        let err = EngineError::ParseError("unexpected token".to_string());
        assert_eq!(err.to_string(), "Parse error: unexpected token");

        let err = EngineError::ExecutionError("bad projection".to_string());
        assert_eq!(err.to_string(), "Query execution error: bad projection");

        let err = EngineError::NoDataset;
        assert_eq!(err.to_string(), "No dataset loaded");

        let err = EngineError::InvalidModel("duplicate measure 'spend'".to_string());
        assert_eq!(err.to_string(), "Invalid model: duplicate measure 'spend'");
    }

    #[test]
    fn test_error_debug() {
        let err = EngineError::NoDataset;
        let debug = format!("{:?}", err);
        assert!(debug.contains("NoDataset"));
    }

    #[test]
    fn test_engine_result_type() {
        let ok_result: EngineResult<i32> = Ok(42);
        assert_eq!(ok_result.unwrap(), 42);

        let err_result: EngineResult<i32> = Err(EngineError::MissingHeader);
        assert!(err_result.is_err());
    }
}
