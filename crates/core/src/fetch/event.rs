use std::fmt;

use tokio::sync::mpsc;

/// Where a load outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSource {
    Cache,
    Network,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    Success,
    Failure,
}

/// Notification delivered to a [`LoadListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadEvent {
    pub source: LoadSource,
    pub state: LoadState,
}

impl LoadEvent {
    pub fn new(source: LoadSource, state: LoadState) -> Self {
        Self { source, state }
    }

    pub fn cache_success() -> Self {
        Self::new(LoadSource::Cache, LoadState::Success)
    }

    pub fn cache_failure() -> Self {
        Self::new(LoadSource::Cache, LoadState::Failure)
    }

    pub fn network_success() -> Self {
        Self::new(LoadSource::Network, LoadState::Success)
    }

    pub fn network_failure() -> Self {
        Self::new(LoadSource::Network, LoadState::Failure)
    }

    pub fn other_failure() -> Self {
        Self::new(LoadSource::Other, LoadState::Failure)
    }

    pub fn is_success(&self) -> bool {
        self.state == LoadState::Success
    }
}

impl fmt::Display for LoadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            LoadSource::Cache => "cache",
            LoadSource::Network => "network",
            LoadSource::Other => "other",
        };
        let state = match self.state {
            LoadState::Success => "success",
            LoadState::Failure => "failure",
        };
        write!(f, "{source}:{state}")
    }
}

/// Observer of load outcomes.
pub trait LoadListener: Send + Sync {
    fn on_load(&self, event: LoadEvent);
}

impl LoadListener for mpsc::UnboundedSender<LoadEvent> {
    fn on_load(&self, event: LoadEvent) {
        if self.send(event).is_err() {
            tracing::trace!(%event, "Load listener receiver dropped");
        }
    }
}
