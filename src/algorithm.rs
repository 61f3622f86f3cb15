use crate::{
    error::ClusterError,
    label::{Label, NOISE},
    neighbors::{GetNeighborhood, Neighborhood},
    space::ClickPoint,
};

/// Parameters of the density clustering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterParams {
    /// neighborhood radius
    pub epsilon: f64,
    /// minimum neighborhood size of a core point, the point itself included
    pub min_samples: usize,
}

impl ClusterParams {
    pub fn new(epsilon: f64, min_samples: usize) -> Self {
        Self {
            epsilon,
            min_samples,
        }
    }

    /// Checks that the parameters describe a usable clustering.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0. {
            return Err(ClusterError::InvalidConfig(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::InvalidConfig(
                "min_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self::new(0.5, 2)
    }
}

/// A density clustering capability.
///
/// Given an ordered set of points, returns one label per point in the same order.
/// [`NOISE`] marks unclustered points; other labels only make sense within one call.
pub trait ClusterFit: Send + Sync {
    fn fit(&self, points: &[ClickPoint], params: &ClusterParams)
        -> Result<Vec<Label>, ClusterError>;
}

/// DBSCAN over the Euclidian plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dbscan;

impl Dbscan {
    pub fn new() -> Self {
        Dbscan
    }

    /// Labels the points given their precomputed neighborhoods.
    /// Clusters are numbered in order of their first core point and grown depth first.
    fn label(neighborhoods: &[Neighborhood], min_samples: usize) -> Vec<Label> {
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|n| n.len() >= min_samples)
            .collect();
        let mut labels = vec![NOISE; neighborhoods.len()];
        let mut next_label: Label = 0;
        let mut stack = vec![];
        for seed in 0..neighborhoods.len() {
            if labels[seed] != NOISE || !is_core[seed] {
                continue;
            }
            stack.push(seed);
            while let Some(i) = stack.pop() {
                if labels[i] != NOISE {
                    continue;
                }
                labels[i] = next_label;
                if is_core[i] {
                    stack.extend(neighborhoods[i].iter().filter(|&j| labels[j] == NOISE));
                }
            }
            next_label += 1;
        }
        labels
    }
}

impl ClusterFit for Dbscan {
    fn fit(
        &self,
        points: &[ClickPoint],
        params: &ClusterParams,
    ) -> Result<Vec<Label>, ClusterError> {
        params.validate()?;
        let neighborhoods = points.get_neighborhoods(params.epsilon);
        Ok(Dbscan::label(&neighborhoods, params.min_samples))
    }
}
