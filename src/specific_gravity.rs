//! Effective specific gravity of multi-phase solids.
//!
//! Densities compose harmonically: the volume of one unit mass of a composite
//! is the mass-weighted sum of its constituents' specific volumes, and the
//! composite's specific gravity is the reciprocal of that volume.
//!
//! The composition runs up a fixed ladder: clinker phases give the clinker,
//! clinker plus calcium sulfates give the cement, and cement plus SCMs give
//! the binder. The last rung needs the cement's volume fraction within the
//! binder, so it runs after a first fraction conversion (see `mix_state`).
//!
//! A specific gravity that is not positive here is a broken precondition
//! (inputs are validated before they reach this module) and panics.

use crate::clinker::{ClinkerPhase, ClinkerPhases};
use crate::config::PhaseSpecificGravities;
use crate::constants::FRACTION_DECIMALS;
use crate::error::{MixError, Result};
use crate::math_utils::round_to;
use serde::Serialize;

fn assert_positive_sgs(specific_gravities: &[f64]) {
    for (i, &sg) in specific_gravities.iter().enumerate() {
        assert!(sg > 0.0, "specific gravity #{i} must be positive, got {sg}");
    }
}

/// Specific gravity of a composite from mass fractions and constituent SGs.
pub fn composite_specific_gravity(mass_fractions: &[f64], specific_gravities: &[f64]) -> f64 {
    assert_eq!(mass_fractions.len(), specific_gravities.len());
    assert_positive_sgs(specific_gravities);

    let volume: f64 = mass_fractions
        .iter()
        .zip(specific_gravities)
        .map(|(m, sg)| m / sg)
        .sum();
    assert!(volume > 0.0, "composite has no volume");
    1.0 / volume
}

/// Volume-weighted specific gravity of the clinker.
///
/// Fractions are renormalised to sum to one first, so a clinker without
/// alkali phases (zero rows) or any uniformly rescaled input gives the same result.
pub fn clinker_specific_gravity(volume_fractions: &[f64], specific_gravities: &[f64]) -> f64 {
    assert_eq!(volume_fractions.len(), specific_gravities.len());
    assert_positive_sgs(specific_gravities);

    let total: f64 = volume_fractions.iter().sum();
    assert!(total > 0.0, "clinker volume fractions sum to zero");

    volume_fractions
        .iter()
        .zip(specific_gravities)
        .map(|(vf, sg)| (vf / total) * sg)
        .sum()
}

/// Specific gravity of a cement made of clinker plus calcium sulfates.
///
/// `clinker_volume_fractions` are fractions within the clinker; the clinker's
/// mass fraction in the cement is whatever the sulfates leave.
pub fn cement_specific_gravity(
    clinker_volume_fractions: &[f64],
    clinker_sg: f64,
    sulfate_mass_fractions: &[f64],
    sulfate_sgs: &[f64],
) -> f64 {
    assert!(clinker_sg > 0.0, "clinker specific gravity must be positive");
    assert_eq!(sulfate_mass_fractions.len(), sulfate_sgs.len());
    assert_positive_sgs(sulfate_sgs);

    let clinker_mass_fraction = 1.0 - sulfate_mass_fractions.iter().sum::<f64>();
    let total: f64 = clinker_volume_fractions.iter().sum();
    assert!(total > 0.0, "clinker volume fractions sum to zero");

    let clinker_volume: f64 = clinker_volume_fractions
        .iter()
        .map(|vf| (vf / total) * clinker_mass_fraction / clinker_sg)
        .sum();
    let sulfate_volume: f64 = sulfate_mass_fractions
        .iter()
        .zip(sulfate_sgs)
        .map(|(m, sg)| m / sg)
        .sum();

    1.0 / (clinker_volume + sulfate_volume)
}

/// Specific gravity of the whole binder from the cement's share of it.
///
/// Equals `1 / Σ(m_i / SG_i)` over binder constituents, recovered from the
/// cement's volume and mass fractions within the binder.
pub fn binder_specific_gravity(cement_vol_frac: f64, cement_mass_frac: f64, cement_sg: f64) -> f64 {
    assert!(cement_mass_frac > 0.0, "binder holds no cement");
    assert!(cement_sg > 0.0, "cement specific gravity must be positive");
    (cement_vol_frac / cement_mass_frac) * cement_sg
}

/// Densities derived for one cement selection, rounded for storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CementDensity {
    pub clinker_mass_fraction: f64,
    pub clinker_sg: f64,
    pub cement_sg: f64,
}

/// Compose clinker then cement specific gravity for a cement's phase data.
///
/// `sulfate_mass_fractions` are [dihydrate, hemihydrate, anhydrite] within the cement.
pub fn compose_cement(
    phases: &ClinkerPhases,
    sulfate_mass_fractions: [f64; 3],
    table: &PhaseSpecificGravities,
) -> Result<CementDensity> {
    for (name, m) in ["dihydrate", "hemihydrate", "anhydrite"]
        .into_iter()
        .zip(sulfate_mass_fractions)
    {
        if !(0.0..=1.0).contains(&m) {
            return Err(MixError::out_of_range(format!("{name} mass fraction"), m));
        }
    }
    let sulfate_total: f64 = sulfate_mass_fractions.iter().sum();
    if sulfate_total >= 1.0 {
        return Err(MixError::out_of_range("total sulfate mass fraction", sulfate_total));
    }

    let volume_fractions = phases.volume_fractions();
    let sgs = ClinkerPhase::ALL.map(|p| p.specific_gravity(table));

    let clinker_sg = clinker_specific_gravity(&volume_fractions, &sgs);
    let cement_sg = cement_specific_gravity(
        &volume_fractions,
        clinker_sg,
        &sulfate_mass_fractions,
        &table.sulfates(),
    );

    Ok(CementDensity {
        clinker_mass_fraction: round_to(1.0 - sulfate_total, FRACTION_DECIMALS),
        clinker_sg: round_to(clinker_sg, FRACTION_DECIMALS),
        cement_sg: round_to(cement_sg, FRACTION_DECIMALS),
    })
}
