use {
    crate::{network::NetworkState, region::WindowSize},
    std::time::Duration,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("target window not found")]
    WindowNotFound,
    #[error("no regions are configured for window size {0}")]
    RegionsUnavailable(WindowSize),
    #[error("region {name:?} is not configured for window size {size}")]
    MissingRegion { name: String, size: WindowSize },
    #[error("no internet connectivity")]
    NoConnectivity,
    /// The adapters were toggled but the expected state wasn't confirmed in time.
    #[error("network did not become {expected} within {timeout:?}")]
    NetworkStateTimeout {
        expected: NetworkState,
        timeout: Duration,
    },
    #[error("another session is already in progress")]
    SessionInProgress,
    #[error("session cancelled")]
    Cancelled,
    #[error("progress bar did not leave standby within {0:?} after clicking upgrade")]
    AttemptNotStarted(Duration),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
