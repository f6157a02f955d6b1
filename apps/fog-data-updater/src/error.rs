use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("ZENTRA returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("ZENTRA request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed ZENTRA response: {0}")]
    MalformedResponse(String),

    #[error("ZENTRA still locked out after {attempts} attempts (last status {status})")]
    LockoutRetriesExhausted { attempts: u32, status: u16 },
}

impl FetchError {
    /// True for failures reported by (or on the way to) the upstream API, as opposed to
    /// caller mistakes or payloads we could not make sense of.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FetchError::Upstream { .. }
                | FetchError::Transport(_)
                | FetchError::LockoutRetriesExhausted { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Google authorization failed: {0}")]
    Auth(String),

    #[error("Google Sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Google Sheets returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected Google Sheets response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request to ZENTRA failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("request to Google failed: {0}")]
    Publish(#[from] SinkError),
}
