//! Mass ↔ volume fraction conversion.
//!
//! For components with mass fractions `m_i` and specific gravities `SG_i`:
//!
//! ```text
//! v_i = (m_i / SG_i) / Σ_j (m_j / SG_j)
//! m_i = (v_i · SG_i) / Σ_j (v_j · SG_j)
//! ```
//!
//! Two fixed instantiations are used by the mix: the binder (cement plus
//! SCMs) and the whole mix (binder as one pseudo-component, four aggregate
//! slots and water).

use crate::constants::{FRACTION_DECIMALS, INACTIVE_SLOT_SG, RATIO_DECIMALS};
use crate::error::{MixError, Result};
use crate::math_utils::{round_to, sums_to_one};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// What part a component plays in the mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentRole {
    BinderPhase,
    Scm,
    CoarseAggregate1,
    CoarseAggregate2,
    FineAggregate1,
    FineAggregate2,
    Water,
}

/// One constituent of a coherent mix snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Component {
    pub name: String,
    pub role: ComponentRole,
    pub mass_fraction: f64,
    pub volume_fraction: f64,
    pub specific_gravity: f64,
}

/// Fractions of a fixed list of components, indexed by a component enum's `as_index`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fractions<const N: usize> {
    pub mass: [f64; N],
    pub volume: [f64; N],
    pub specific_gravity: [f64; N],
}

impl<const N: usize> Default for Fractions<N> {
    fn default() -> Self {
        Self {
            mass: [0.0; N],
            volume: [0.0; N],
            specific_gravity: [INACTIVE_SLOT_SG; N],
        }
    }
}

impl<const N: usize> Serialize for Fractions<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Fractions", 3)?;
        s.serialize_field("mass", &self.mass[..])?;
        s.serialize_field("volume", &self.volume[..])?;
        s.serialize_field("specific_gravity", &self.specific_gravity[..])?;
        s.end()
    }
}

/// Check fractions and specific gravities, substituting the placeholder SG
/// for components that carry nothing.
fn checked_inputs<const N: usize>(
    context: &str,
    fractions: &[f64; N],
    specific_gravities: &[f64; N],
    tolerance: f64,
) -> Result<[f64; N]> {
    for &f in fractions {
        if !(0.0..=1.0).contains(&f) {
            return Err(MixError::out_of_range(format!("{context} fraction"), f));
        }
    }
    let sum: f64 = fractions.iter().sum();
    if sum <= 0.0 {
        return Err(MixError::EmptyComposition(context.to_string()));
    }
    if !sums_to_one(sum, tolerance) {
        return Err(MixError::mass_fraction_sum(context, sum));
    }

    let mut sgs = *specific_gravities;
    for (i, sg) in sgs.iter_mut().enumerate() {
        if fractions[i] == 0.0 {
            if !(*sg > 0.0 && sg.is_finite()) {
                *sg = INACTIVE_SLOT_SG;
            }
        } else if !(*sg > 0.0 && sg.is_finite()) {
            return Err(MixError::invalid_sg(format!("{context} component #{i}"), *sg));
        }
    }
    Ok(sgs)
}

impl<const N: usize> Fractions<N> {
    /// Derive volume fractions from mass fractions that sum to one.
    ///
    /// Fractions off by more than `tolerance` are rejected, never renormalised.
    pub fn from_mass(
        context: &str,
        mass: [f64; N],
        specific_gravity: [f64; N],
        tolerance: f64,
    ) -> Result<Self> {
        let specific_gravity = checked_inputs(context, &mass, &specific_gravity, tolerance)?;

        let total: f64 = mass.iter().zip(&specific_gravity).map(|(m, sg)| m / sg).sum();
        let volume = std::array::from_fn(|i| (mass[i] / specific_gravity[i]) / total);

        Ok(Self {
            mass,
            volume,
            specific_gravity,
        })
    }

    /// Derive mass fractions from volume fractions that sum to one.
    pub fn from_volume(
        context: &str,
        volume: [f64; N],
        specific_gravity: [f64; N],
        tolerance: f64,
    ) -> Result<Self> {
        let specific_gravity = checked_inputs(context, &volume, &specific_gravity, tolerance)?;

        let total: f64 = volume.iter().zip(&specific_gravity).map(|(v, sg)| v * sg).sum();
        let mass = std::array::from_fn(|i| (volume[i] * specific_gravity[i]) / total);

        Ok(Self {
            mass,
            volume,
            specific_gravity,
        })
    }

    /// Copy with every value rounded to the persisted precision.
    pub fn rounded(&self) -> Self {
        Self {
            mass: self.mass.map(|v| round_to(v, FRACTION_DECIMALS)),
            volume: self.volume.map(|v| round_to(v, FRACTION_DECIMALS)),
            specific_gravity: self.specific_gravity.map(|v| round_to(v, FRACTION_DECIMALS)),
        }
    }

    pub fn mass_sum(&self) -> f64 {
        self.mass.iter().sum()
    }

    pub fn volume_sum(&self) -> f64 {
        self.volume.iter().sum()
    }
}

// ------------------------- binder -------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum BinderConstituent {
    Cement = 0,
    SilicaFume = 1,
    FlyAsh = 2,
    Slag = 3,
    CaCO3 = 4,
    FreeLime = 5,
    InertFiller = 6,
}

impl BinderConstituent {
    pub const COUNT: usize = 7;
    pub const ALL: [BinderConstituent; Self::COUNT] = [
        BinderConstituent::Cement,
        BinderConstituent::SilicaFume,
        BinderConstituent::FlyAsh,
        BinderConstituent::Slag,
        BinderConstituent::CaCO3,
        BinderConstituent::FreeLime,
        BinderConstituent::InertFiller,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            BinderConstituent::Cement => "cement",
            BinderConstituent::SilicaFume => "silica fume",
            BinderConstituent::FlyAsh => "fly ash",
            BinderConstituent::Slag => "slag",
            BinderConstituent::CaCO3 => "CaCO3",
            BinderConstituent::FreeLime => "free lime",
            BinderConstituent::InertFiller => "inert filler",
        }
    }

    pub fn role(self) -> ComponentRole {
        match self {
            BinderConstituent::Cement => ComponentRole::BinderPhase,
            _ => ComponentRole::Scm,
        }
    }
}

pub type BinderFractions = Fractions<{ BinderConstituent::COUNT }>;

impl BinderFractions {
    pub fn mass_of(&self, c: BinderConstituent) -> f64 {
        self.mass[c.as_index()]
    }

    pub fn volume_of(&self, c: BinderConstituent) -> f64 {
        self.volume[c.as_index()]
    }

    pub fn sg_of(&self, c: BinderConstituent) -> f64 {
        self.specific_gravity[c.as_index()]
    }
}

// ------------------------- whole mix -------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum MixConstituent {
    Binder = 0,
    Coarse1 = 1,
    Fine1 = 2,
    Coarse2 = 3,
    Fine2 = 4,
    Water = 5,
}

impl MixConstituent {
    pub const COUNT: usize = 6;
    pub const ALL: [MixConstituent; Self::COUNT] = [
        MixConstituent::Binder,
        MixConstituent::Coarse1,
        MixConstituent::Fine1,
        MixConstituent::Coarse2,
        MixConstituent::Fine2,
        MixConstituent::Water,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn role(self) -> ComponentRole {
        match self {
            MixConstituent::Binder => ComponentRole::BinderPhase,
            MixConstituent::Coarse1 => ComponentRole::CoarseAggregate1,
            MixConstituent::Fine1 => ComponentRole::FineAggregate1,
            MixConstituent::Coarse2 => ComponentRole::CoarseAggregate2,
            MixConstituent::Fine2 => ComponentRole::FineAggregate2,
            MixConstituent::Water => ComponentRole::Water,
        }
    }
}

pub type MixFractions = Fractions<{ MixConstituent::COUNT }>;

impl MixFractions {
    pub fn mass_of(&self, c: MixConstituent) -> f64 {
        self.mass[c.as_index()]
    }

    pub fn volume_of(&self, c: MixConstituent) -> f64 {
        self.volume[c.as_index()]
    }

    /// Water to binder mass ratio, rounded to three decimals.
    pub fn water_binder_ratio(&self) -> Result<f64> {
        let binder = self.mass_of(MixConstituent::Binder);
        if binder <= 0.0 {
            return Err(MixError::EmptyComposition("binder".to_string()));
        }
        Ok(round_to(self.mass_of(MixConstituent::Water) / binder, RATIO_DECIMALS))
    }
}

/// Mass fractions of binder and water that fill what the aggregates leave,
/// at the given water/binder ratio.
///
/// Returns `(binder, water)`.
pub fn solve_binder_water(aggregate_mass: f64, water_binder_ratio: f64) -> Result<(f64, f64)> {
    if !(water_binder_ratio > 0.0 && water_binder_ratio.is_finite()) {
        return Err(MixError::out_of_range("water/binder ratio", water_binder_ratio));
    }
    let paste = 1.0 - aggregate_mass;
    if !(0.0..1.0).contains(&aggregate_mass) {
        return Err(MixError::out_of_range("total aggregate mass fraction", aggregate_mass));
    }
    let binder = paste / (1.0 + water_binder_ratio);
    Ok((binder, paste - binder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRACTION_SUM_TOLERANCE as TOL;
    use approx::assert_abs_diff_eq;

    fn sample_binder() -> BinderFractions {
        Fractions::from_mass(
            "binder",
            [0.7, 0.05, 0.15, 0.1, 0.0, 0.0, 0.0],
            [3.15, 2.22, 2.2, 2.87, 2.71, 3.31, 0.0],
            TOL,
        )
        .unwrap()
    }

    #[test]
    fn test_volume_fractions_sum_to_one() {
        let binder = sample_binder();
        assert_abs_diff_eq!(binder.volume_sum(), 1.0, epsilon = 1e-6);

        // denser components lose volume share
        assert!(binder.volume_of(BinderConstituent::Cement) < 0.7);
        assert!(binder.volume_of(BinderConstituent::FlyAsh) > 0.15);
    }

    #[test]
    fn test_unset_sg_on_absent_component_is_ignored() {
        let binder = sample_binder();
        assert_eq!(binder.volume_of(BinderConstituent::InertFiller), 0.0);
        assert_eq!(binder.sg_of(BinderConstituent::InertFiller), INACTIVE_SLOT_SG);
    }

    #[test]
    fn test_mass_volume_round_trip() {
        let binder = sample_binder();
        let back =
            BinderFractions::from_volume("binder", binder.volume, binder.specific_gravity, TOL)
                .unwrap();
        for i in 0..BinderConstituent::COUNT {
            assert_abs_diff_eq!(back.mass[i], binder.mass[i], epsilon = 1e-9);
        }
    }

    /// Deterministic spread of mass fractions (some zero) and SGs between 1.0 and 3.8.
    fn sweep_inputs<const N: usize>(seed: usize) -> ([f64; N], [f64; N]) {
        let weights: [f64; N] = std::array::from_fn(|i| {
            if (seed + i) % 5 == 0 { 0.0 } else { ((seed * 7 + i * 13) % 17 + 1) as f64 }
        });
        let total: f64 = weights.iter().sum();
        let mass = weights.map(|w| w / total);
        let sgs = std::array::from_fn(|i| 1.0 + ((seed * 3 + i * 11) % 29) as f64 * 0.1);
        (mass, sgs)
    }

    fn check_sweep<const N: usize>(context: &str) {
        for seed in 0..60 {
            let (mass, sgs) = sweep_inputs::<N>(seed);
            let forward = Fractions::from_mass(context, mass, sgs, TOL).unwrap();
            assert_abs_diff_eq!(forward.volume_sum(), 1.0, epsilon = 1e-6);

            let back = Fractions::from_volume(context, forward.volume, sgs, TOL).unwrap();
            for i in 0..N {
                assert_abs_diff_eq!(back.mass[i], mass[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_binder_sweep_sums_and_round_trips() {
        check_sweep::<{ BinderConstituent::COUNT }>("binder");
    }

    #[test]
    fn test_mix_sweep_sums_and_round_trips() {
        check_sweep::<{ MixConstituent::COUNT }>("mix");
    }

    #[test]
    fn test_rejects_bad_sum_without_renormalising() {
        let result = MixFractions::from_mass(
            "mix",
            [0.5, 0.2, 0.0, 0.0, 0.0, 0.2],
            [3.1, 2.65, 2.65, 2.65, 2.65, 1.0],
            TOL,
        );
        assert!(matches!(result, Err(MixError::MassFractionSum { .. })));
    }

    #[test]
    fn test_rejects_empty_and_invalid_inputs() {
        let zero = MixFractions::from_mass("mix", [0.0; 6], [1.0; 6], TOL);
        assert!(matches!(zero, Err(MixError::EmptyComposition(_))));

        let bad_sg = MixFractions::from_mass(
            "mix",
            [0.7, 0.0, 0.0, 0.0, 0.0, 0.3],
            [0.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            TOL,
        );
        assert!(matches!(bad_sg, Err(MixError::InvalidSpecificGravity { .. })));

        let negative =
            MixFractions::from_mass("mix", [1.2, 0.0, 0.0, 0.0, 0.0, -0.2], [1.0; 6], TOL);
        assert!(matches!(negative, Err(MixError::FractionOutOfRange { .. })));
    }

    #[test]
    fn test_cement_and_water_only() {
        let (binder, water) = solve_binder_water(0.0, 0.45).unwrap();
        assert_abs_diff_eq!(water, 0.3103, epsilon = 1e-4);
        assert_abs_diff_eq!(binder, 0.6897, epsilon = 1e-4);

        let mix = MixFractions::from_mass(
            "mix",
            [binder, 0.0, 0.0, 0.0, 0.0, water],
            [3.15, 0.0, 0.0, 0.0, 0.0, 1.0],
            TOL,
        )
        .unwrap();
        assert_eq!(mix.water_binder_ratio().unwrap(), 0.45);

        // water volume share = (0.3103 / 1.0) / (0.3103 + 0.6897 / 3.15)
        let expected_water = (water / 1.0) / (water / 1.0 + binder / 3.15);
        assert_abs_diff_eq!(mix.volume_of(MixConstituent::Water), expected_water, epsilon = 1e-12);
        assert_abs_diff_eq!(mix.volume_sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_binder_water_with_aggregate() {
        let (binder, water) = solve_binder_water(0.7, 0.5).unwrap();
        assert_abs_diff_eq!(binder, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(water, 0.1, epsilon = 1e-12);
        assert!(solve_binder_water(1.0, 0.5).is_err());
        assert!(solve_binder_water(0.5, 0.0).is_err());
    }

    #[test]
    fn test_rounded_view() {
        let rounded = sample_binder().rounded();
        for v in rounded.volume {
            assert_eq!(v, round_to(v, FRACTION_DECIMALS));
        }
        assert_abs_diff_eq!(rounded.volume_sum(), 1.0, epsilon = TOL);
    }
}
