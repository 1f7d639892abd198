pub type CablerigResult<T> = Result<T, CablerigError>;

#[derive(thiserror::Error, Debug)]
pub enum CablerigError {
    #[error("no curve geometry: {0}")]
    NotACurve(String),

    #[error("host operation failed: {0}")]
    Host(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CablerigError {
    pub fn not_a_curve(msg: impl Into<String>) -> Self {
        Self::NotACurve(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}
