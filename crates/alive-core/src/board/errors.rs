use crate::errors::AliveError;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Cannot insert box '{box_id}': '{after_id}' is neither a box nor an anchor")]
    AnchorNotFound { box_id: String, after_id: String },

    #[error("Invalid box: {message}")]
    InvalidBox { message: String },
}

impl AliveError for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            BoardError::AnchorNotFound { .. } => "ANCHOR_NOT_FOUND",
            BoardError::InvalidBox { .. } => "INVALID_BOX",
        }
    }
}
