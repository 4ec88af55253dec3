use std::fmt;

use harvester_core::{ProgramId, ProgramOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    CheckingCache,
    Downloading,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramProgress {
    pub program_id: ProgramId,
    pub stage: Stage,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    Progress(ProgramProgress),
    ProgramCompleted {
        program_id: ProgramId,
        outcome: ProgramOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network trouble, timeouts, 429 and 5xx are worth another attempt;
    /// everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FailureKind::Network | FailureKind::Timeout => true,
            FailureKind::HttpStatus(code) => code == 429 || (500..600).contains(&code),
            FailureKind::InvalidUrl
            | FailureKind::RedirectLimitExceeded
            | FailureKind::TooLarge { .. }
            | FailureKind::UnsupportedContentType { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let transient = [
            FailureKind::Network,
            FailureKind::Timeout,
            FailureKind::HttpStatus(429),
            FailureKind::HttpStatus(500),
            FailureKind::HttpStatus(503),
        ];
        for kind in transient {
            assert!(FetchError::new(kind.clone(), "x").is_transient(), "{kind}");
        }

        let permanent = [
            FailureKind::HttpStatus(404),
            FailureKind::HttpStatus(400),
            FailureKind::InvalidUrl,
            FailureKind::TooLarge {
                max_bytes: 1,
                actual: None,
            },
        ];
        for kind in permanent {
            assert!(!FetchError::new(kind.clone(), "x").is_transient(), "{kind}");
        }
    }
}
