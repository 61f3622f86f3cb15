//! Assigns arriving clicks to clusters, page by page.
//!
//! Every click triggers a clustering of the whole page history, the new click included.
//! Raw labels are not stable from one clustering to the next, so the tracker remembers
//! which normalized labels were already reported for a page to tell whether a click
//! falls in a cluster never seen before.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    algorithm::{ClusterFit, ClusterParams},
    error::ClusterError,
    label::{Label, LabelPolicy},
    space::ClickPoint,
    store::{validate_page_id, PageStreamStore},
};

/// Default bound on clusterings running on helper threads when a timeout is set.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Outcome of a click that is classified and tracked for novelty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Observation {
    #[serde(rename = "cluster_idx")]
    pub normalized_label: Label,
    pub is_new: bool,
}

/// Outcome of a click that is only classified. `None` means the click belongs to no cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Prediction {
    #[serde(rename = "cluster_idx")]
    pub normalized_label: Option<Label>,
}

/// Incremental per page cluster tracker.
pub struct ClickTracker {
    store: Arc<PageStreamStore>,
    clustering: Arc<dyn ClusterFit>,
    params: ClusterParams,
    timeout: Option<Duration>,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a clustering as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    /// Registers a clustering, unless `max` are already running.
    fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < max {
                    Some(n + 1)
                } else {
                    None
                }
            })
            .ok()
            .map(|_| InFlight(counter.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ClickTracker {
    /// Builds a new tracker over the given store and clustering capability.
    pub fn new(
        store: Arc<PageStreamStore>,
        clustering: Arc<dyn ClusterFit>,
        params: ClusterParams,
    ) -> Result<Self, ClusterError> {
        params.validate()?;
        Ok(Self {
            store,
            clustering,
            params,
            timeout: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bounds the duration of a single clustering.
    /// A clustering that times out keeps running on its helper thread until it completes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bounds the number of helper threads clustering at once, timed out ones included.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn store(&self) -> &Arc<PageStreamStore> {
        &self.store
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Records a click, classifies it and tells whether its cluster is new for the page.
    /// Labels are offset by one: noise is reported as cluster `0`.
    pub fn observe(
        &self,
        page_id: &str,
        point: ClickPoint,
    ) -> Result<Observation, ClusterError> {
        validate(page_id, &point)?;
        self.store.with_page(page_id, |stream| {
            let raw = self.classify(stream.candidate(point))?;
            let normalized_label = LabelPolicy::Offset.normalize(raw).ok_or_else(|| {
                ClusterError::ClusteringUnavailable(format!("label {} cannot be offset", raw))
            })?;
            stream.append(point);
            debug!("page {}: seen labels before {:?}", page_id, stream.seen_labels());
            let is_new = stream.record_label(normalized_label);
            debug!(
                "page {}: cluster {} (new: {}), seen labels after {:?}",
                page_id,
                normalized_label,
                is_new,
                stream.seen_labels()
            );
            Ok(Observation {
                normalized_label,
                is_new,
            })
        })
    }

    /// Records a click and classifies it, leaving the seen labels untouched.
    /// Noise is reported as no cluster.
    pub fn predict(&self, page_id: &str, point: ClickPoint) -> Result<Prediction, ClusterError> {
        validate(page_id, &point)?;
        self.store.with_page(page_id, |stream| {
            let raw = self.classify(stream.candidate(point))?;
            stream.append(point);
            let normalized_label = LabelPolicy::Sentinel.normalize(raw);
            debug!("page {}: predicted cluster {:?}", page_id, normalized_label);
            Ok(Prediction { normalized_label })
        })
    }

    /// Clusters the snapshot and returns the raw label of its last point.
    fn classify(&self, snapshot: Vec<ClickPoint>) -> Result<Label, ClusterError> {
        let count = snapshot.len();
        let labels = self.fit(snapshot).map_err(|reason| {
            warn!("clustering of {} clicks failed: {}", count, reason);
            unavailable(reason)
        })?;
        if labels.len() != count {
            return Err(ClusterError::ClusteringUnavailable(format!(
                "expected {} labels, got {}",
                count,
                labels.len()
            )));
        }
        labels
            .last()
            .copied()
            .ok_or_else(|| ClusterError::ClusteringUnavailable("no label produced".into()))
    }

    fn fit(&self, snapshot: Vec<ClickPoint>) -> Result<Vec<Label>, ClusterError> {
        match self.timeout {
            None => fit_guarded(self.clustering.as_ref(), &snapshot, &self.params),
            Some(limit) => {
                let in_flight = InFlight::acquire(&self.in_flight, self.max_in_flight)
                    .ok_or_else(|| {
                        ClusterError::ClusteringUnavailable(format!(
                            "{} clusterings already running",
                            self.max_in_flight
                        ))
                    })?;
                let (sender, receiver) = mpsc::channel();
                let clustering = self.clustering.clone();
                let params = self.params;
                thread::Builder::new()
                    .name("clustering".into())
                    .spawn(move || {
                        let _in_flight = in_flight;
                        let _ = sender.send(fit_guarded(clustering.as_ref(), &snapshot, &params));
                    })
                    .map_err(|reason| {
                        ClusterError::ClusteringUnavailable(format!(
                            "cannot start clustering thread: {}",
                            reason
                        ))
                    })?;
                receiver.recv_timeout(limit).map_err(|_| {
                    ClusterError::ClusteringUnavailable(format!(
                        "clustering did not complete within {:?}",
                        limit
                    ))
                })?
            }
        }
    }
}

/// Runs the clustering, reporting a panic as unavailability.
fn fit_guarded(
    clustering: &dyn ClusterFit,
    snapshot: &[ClickPoint],
    params: &ClusterParams,
) -> Result<Vec<Label>, ClusterError> {
    panic::catch_unwind(AssertUnwindSafe(|| clustering.fit(snapshot, params)))
        .unwrap_or_else(|_| Err(ClusterError::ClusteringUnavailable("clustering panicked".into())))
}

/// Rejects clicks that must not reach the store.
fn validate(page_id: &str, point: &ClickPoint) -> Result<(), ClusterError> {
    validate_page_id(page_id)?;
    if !point.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "coordinates must be finite, got ({}, {})",
            point.x, point.y
        )));
    }
    Ok(())
}

/// Any clustering failure is reported as unavailability to the caller.
fn unavailable(reason: ClusterError) -> ClusterError {
    match reason {
        ClusterError::ClusteringUnavailable(_) => reason,
        other => ClusterError::ClusteringUnavailable(other.to_string()),
    }
}
