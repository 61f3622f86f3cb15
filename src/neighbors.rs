use crate::space::{squared_dist, ClickPoint};

/// The indices of the points lying within some radius of a point, the point itself included.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Neighborhood(pub Vec<usize>);

impl Neighborhood {
    /// Number of points in the neighborhood.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the neighbor indices in input order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

/// Defines an epsilon-neighborhood getter function.
///
/// This trait is implemented by structs that represent an indexed set of points in the plane.
pub trait GetNeighborhood {
    /// Get the indices of all the points at a distance lower or equal to `epsilon` from the given point.
    /// ```
    /// use fluent_clicks::neighbors::*;
    /// use fluent_clicks::space::ClickPoint;
    ///
    /// let clicks = vec![
    ///     ClickPoint::new(0., 0.),
    ///     ClickPoint::new(0.3, 0.3),
    ///     ClickPoint::new(3., 3.),
    /// ];
    /// let nn = clicks.get_neighborhood(&clicks[0], 0.5);
    /// assert_eq!(Neighborhood(vec![0, 1]), nn);
    /// ```
    fn get_neighborhood(&self, point: &ClickPoint, epsilon: f64) -> Neighborhood;

    /// Get the neighborhoods of every point of the set, in order.
    fn get_neighborhoods(&self, epsilon: f64) -> Vec<Neighborhood>;
}

/// Implementation of epsilon-neighborhood getter for a slice of points.
impl GetNeighborhood for [ClickPoint] {
    fn get_neighborhood(&self, point: &ClickPoint, epsilon: f64) -> Neighborhood {
        let radius = epsilon * epsilon;
        let indices = self
            .iter()
            .enumerate()
            .filter(|(_, p)| squared_dist(point, p) <= radius)
            .map(|(i, _)| i)
            .collect();
        Neighborhood(indices)
    }

    fn get_neighborhoods(&self, epsilon: f64) -> Vec<Neighborhood> {
        self.iter()
            .map(|p| self.get_neighborhood(p, epsilon))
            .collect()
    }
}
