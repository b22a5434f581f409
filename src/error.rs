use std::io;

use thiserror::Error;

/// The reason a [`Promise`](crate::Promise) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejected {
    reason: String,
}

impl Rejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Rejected {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A promise was rejected and nothing had subscribed to it by the time the
    /// task queue ran dry.
    #[error("unhandled promise rejection: {0}")]
    UnhandledRejection(Rejected),
    #[error("failed to write to the console")]
    Console(#[from] io::Error),
}
