use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay rejected submission with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("queue id is missing or empty")]
    InvalidQueueId,

    #[error("transaction hash not available after {attempts} attempts")]
    ResolutionTimeout { attempts: u32 },

    #[error("all {attempts} status attempts failed, last error: {last}")]
    ResolutionError { attempts: u32, last: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),
}
