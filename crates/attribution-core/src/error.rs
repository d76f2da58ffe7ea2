use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing category '{category}' in period {period}")]
    MissingCategory { category: String, period: String },

    #[error("Undefined return: {context}")]
    UndefinedReturn { context: String },

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AttributionError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AttributionError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        AttributionError::ArithmeticOverflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(e: serde_json::Error) -> Self {
        AttributionError::SerializationError(e.to_string())
    }
}
