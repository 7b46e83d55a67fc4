use thiserror::Error;

#[derive(Debug, Error)]
pub enum HygieneError {
    #[error("confirmation required: cleanup permanently deletes users, take a backup and confirm explicitly")]
    ConfirmationRequired,

    #[error("policy not specified: pass --keep oldest or --keep newest")]
    PolicyNotSpecified,

    #[error("delete mismatch: planned {expected} rows, store deleted {actual}; rolled back")]
    DeleteMismatch { expected: u64, actual: u64 },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}
