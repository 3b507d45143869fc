use crate::cache::BackendKind;
use crate::fetch::Result;
use crate::storage::Connectivity;

use super::{DataSource, Strategy};

/// Outcome of a strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// A cache tier produced data or a network request was dispatched.
    pub loaded: bool,
    pub network_dispatched: bool,
}

impl Selection {
    fn cached(loaded: bool) -> Self {
        Self {
            loaded,
            network_dispatched: false,
        }
    }
}

/// Runs the load sequence prescribed by `strategy`.
///
/// `persistent` is the kind of the repository's primary backend and is used
/// for every "database" read. Connectivity is probed once per call.
pub async fn select_data<D>(
    strategy: Strategy,
    persistent: BackendKind,
    connectivity: &dyn Connectivity,
    source: &D,
) -> Result<Selection>
where
    D: DataSource + ?Sized,
{
    let online = connectivity.is_available();
    tracing::trace!(%strategy, %persistent, online, "Selecting data");

    match strategy {
        Strategy::NoCache => {
            if online {
                dispatch_network(source, false).await
            } else {
                Ok(Selection::default())
            }
        }
        Strategy::DatabaseCache => {
            let hit = source.load_from_cache(persistent).await?;
            if online {
                dispatch_network(source, hit).await
            } else {
                Ok(Selection::cached(hit))
            }
        }
        Strategy::MemoryCache => {
            let mut hit = source.load_from_cache(BackendKind::Memory).await?;
            if !hit {
                hit = source.load_from_cache(persistent).await?;
            }
            if online {
                dispatch_network(source, hit).await
            } else {
                Ok(Selection::cached(hit))
            }
        }
        Strategy::DatabaseCacheNoNetwork => {
            if online {
                dispatch_network(source, false).await
            } else {
                let hit = source.load_from_cache(persistent).await?;
                Ok(Selection::cached(hit))
            }
        }
    }
}

async fn dispatch_network<D>(source: &D, cached: bool) -> Result<Selection>
where
    D: DataSource + ?Sized,
{
    match source.load_from_network().await {
        Ok(()) => Ok(Selection {
            loaded: true,
            network_dispatched: true,
        }),
        Err(err) if err.is_escalating() => Err(err),
        Err(err) => {
            tracing::warn!(error = %err, cached, "Network dispatch failed, keeping cache result");
            Ok(Selection::cached(cached))
        }
    }
}
