use tiercache_core::strategy::Strategy;
use tiercache_core::{PayloadMode, PayloadType};

/// Validated, immutable configuration of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub strategy: Strategy,
    pub mode: PayloadMode,
    pub payload_type: PayloadType,
    /// Log every published model at debug level.
    pub log_print: bool,
    /// Clear the sink and cached data when the upstream reports a failure.
    pub clear_on_network_error: bool,
    /// Keep network results per map key instead of replacing the sink value.
    pub disallow_force_update: bool,
    /// Append each fetched page to the current list.
    pub page_append: bool,
    pub description: String,
    /// The repository relays published values through a [`RelayRegistry`].
    ///
    /// [`RelayRegistry`]: tiercache_core::relay::RelayRegistry
    pub notify: bool,
}

impl RepositoryConfig {
    pub fn is_list(&self) -> bool {
        self.mode == PayloadMode::List
    }

    /// Label used in log output: the description, or the payload type name.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            self.payload_type.short_name()
        } else {
            &self.description
        }
    }
}
