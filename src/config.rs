use std::{sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    algorithm::{ClusterParams, Dbscan},
    error::ClusterError,
    store::PageStreamStore,
    tracker::ClickTracker,
};

/// Streams clicks from stdin and reports the cluster of each click on stdout.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(author, version, about)]
pub struct Config {
    /// Neighborhood radius of the density clustering.
    #[clap(long, default_value_t = 0.5)]
    pub epsilon: f64,

    /// Minimum number of clicks, the click itself included, that make a dense region.
    #[clap(long, default_value_t = 2)]
    pub min_samples: usize,

    /// Keep only the most recent clicks of each page. Unbounded by default.
    #[clap(long)]
    pub max_history: Option<usize>,

    /// Give up on a clustering after this many milliseconds.
    #[clap(long)]
    pub timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: 0.5,
            min_samples: 2,
            max_history: None,
            timeout_ms: None,
        }
    }
}

impl Config {
    pub fn params(&self) -> ClusterParams {
        ClusterParams::new(self.epsilon, self.min_samples)
    }

    /// Builds a tracker over a fresh store, clustering with DBSCAN.
    pub fn tracker(&self) -> Result<ClickTracker, ClusterError> {
        let store = match self.max_history {
            Some(0) => {
                return Err(ClusterError::InvalidConfig(
                    "max_history must be at least 1".into(),
                ))
            }
            Some(max) => PageStreamStore::with_max_history(max),
            None => PageStreamStore::new(),
        };
        let tracker = ClickTracker::new(Arc::new(store), Arc::new(Dbscan), self.params())?;
        Ok(match self.timeout_ms {
            Some(ms) => tracker.with_timeout(Duration::from_millis(ms)),
            None => tracker,
        })
    }
}
