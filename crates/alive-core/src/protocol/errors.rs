use crate::errors::AliveError;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {source}")]
    MalformedEnvelope {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("Undecodable event: {reason}")]
    InvalidEncoding { reason: String },

    #[error("Event stream read failed: {source}")]
    StreamIo {
        #[from]
        source: std::io::Error,
    },
}

impl AliveError for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            ProtocolError::MalformedEnvelope { .. } => "MALFORMED_ENVELOPE",
            ProtocolError::InvalidDuration { .. } => "INVALID_DURATION",
            ProtocolError::InvalidEncoding { .. } => "INVALID_ENCODING",
            ProtocolError::StreamIo { .. } => "STREAM_IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_duration_display() {
        let error = ProtocolError::InvalidDuration {
            value: "5x".to_string(),
            reason: "unknown unit 'x'".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid duration '5x': unknown unit 'x'");
        assert_eq!(error.error_code(), "INVALID_DURATION");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_malformed_envelope_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ProtocolError::from(source);
        assert_eq!(error.error_code(), "MALFORMED_ENVELOPE");
        assert!(error.to_string().starts_with("Malformed envelope:"));
    }
}
