//! Cubic simulation domain sized from the active aggregate gradings.
//!
//! The box must hold the largest particles with room to spare and the voxels
//! must be fine enough to resolve the smallest ones:
//!
//! ```text
//! resolution = floor₂(smallest / RESOLUTION_SAFETY_COEFFICIENT)
//! edge       = ⌈(largest / SIZE_SAFETY_COEFFICIENT) / resolution⌉ · resolution
//! ```
//!
//! Both values are kept to two decimals and the edge is a whole number of voxels.

use crate::constants::{
    GEOMETRY_DECIMALS, GEOMETRY_EPSILON, RESOLUTION_SAFETY_COEFFICIENT, SIZE_SAFETY_COEFFICIENT,
};
use crate::error::{MixError, Result};
use crate::grading::{Grading, SieveExtremes};
use crate::math_utils::{floor_to, round_to};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DomainGeometry {
    /// Shared X/Y/Z edge length, in the grading's length unit
    pub edge_length: f64,
    /// Length of one voxel edge
    pub resolution: f64,
}

impl DomainGeometry {
    pub fn dims(&self) -> [f64; 3] {
        [self.edge_length; 3]
    }

    pub fn voxels_per_edge(&self) -> u64 {
        (self.edge_length / self.resolution).round() as u64
    }

    /// Geometry that fits particles between `smallest` and `largest`.
    pub fn for_extremes(extremes: SieveExtremes) -> Result<Self> {
        let SieveExtremes { largest, smallest } = extremes;
        if !(smallest > 0.0 && largest.is_finite()) {
            return Err(MixError::DegenerateGeometry(format!(
                "smallest present diameter is {smallest}"
            )));
        }
        if smallest > largest {
            return Err(MixError::DegenerateGeometry(format!(
                "smallest present diameter {smallest} exceeds largest {largest}"
            )));
        }

        // floored: resolution must never exceed smallest / RESOLUTION_SAFETY_COEFFICIENT
        let resolution = floor_to(smallest / RESOLUTION_SAFETY_COEFFICIENT, GEOMETRY_DECIMALS);
        if resolution <= 0.0 {
            return Err(MixError::DegenerateGeometry(format!(
                "diameter {smallest} is too small for a {}-decimal resolution",
                GEOMETRY_DECIMALS
            )));
        }

        // rounded up: the edge must reach largest / SIZE_SAFETY_COEFFICIENT
        let raw_edge = largest / SIZE_SAFETY_COEFFICIENT;
        let multiple = (raw_edge / resolution - GEOMETRY_EPSILON).ceil().max(1.0);
        let edge_length = round_to(multiple * resolution, GEOMETRY_DECIMALS);

        Ok(DomainGeometry {
            edge_length,
            resolution,
        })
    }
}

/// Combined extremes over every active grading: widest top, finest bottom.
pub fn combined_extremes(gradings: &[&Grading]) -> Result<SieveExtremes> {
    gradings
        .iter()
        .map(|g| g.extremes())
        .reduce(SieveExtremes::merge)
        .ok_or(MixError::NoActiveGradings)
}

/// Recompute the domain from scratch for the given active gradings.
pub fn auto_size(gradings: &[&Grading]) -> Result<DomainGeometry> {
    let extremes = combined_extremes(gradings)?;
    match DomainGeometry::for_extremes(extremes) {
        Ok(geometry) => {
            info!(
                gradings = gradings.len(),
                largest = extremes.largest,
                smallest = extremes.smallest,
                edge = geometry.edge_length,
                resolution = geometry.resolution,
                "Domain geometry derived"
            );
            Ok(geometry)
        }
        Err(e) => {
            warn!(error = %e, "Domain geometry rejected");
            Err(e)
        }
    }
}
