use crate::core::geo::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};

/// Region of interest that grows to encompass every point it is extended with.
///
/// The accumulator never shrinks. Besides the resulting bounds it remembers
/// the ordered list of points it was extended with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsAccumulator {
    points: Vec<LatLng>,
    bounds: Option<LatLngBounds>,
}

impl BoundsAccumulator {
    /// Creates an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an accumulator from scratch out of a set of points
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut accumulator = Self::new();
        for point in points {
            accumulator.extend(point);
        }
        accumulator
    }

    /// Extends the accumulated bounds to include a point
    pub fn extend(&mut self, point: LatLng) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(&point),
            None => self.bounds = Some(LatLngBounds::from_point(point)),
        }
        self.points.push(point);
    }

    /// Points the accumulator was extended with, in call order
    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    /// Union of every extended point, `None` while empty
    pub fn bounds(&self) -> Option<&LatLngBounds> {
        self.bounds.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}
