//! Mix snapshot and the recompute step applied on every edit.
//!
//! A [`MixState`] is an immutable, internally consistent snapshot. Each edit
//! is a [`MixChange`]; [`recompute`] builds the next snapshot from the current
//! one and never touches its input, so a rejected edit leaves the caller's
//! state exactly as it was.
//!
//! Fractions are derived in a fixed order:
//!
//! 1. cement phases → clinker SG → cement SG (only when the cement changes)
//! 2. binder-internal pass: mass → volume fractions of cement and SCMs
//! 3. binder SG from the cement's volume and mass share of the binder
//! 4. mix-level pass: binder, aggregates and water, using the binder SG of step 3
//!
//! Two passes are enough: the binder-internal fractions depend only on the
//! binder mass fractions and constituent SGs, never on the binder SG.
//! Domain geometry is re-derived whenever an aggregate slot or grading changes.

use crate::clinker::ClinkerPhases;
use crate::config::MixConfig;
use crate::constants::{FRACTION_DECIMALS, INACTIVE_SLOT_SG};
use crate::domain_geometry::{self, DomainGeometry};
use crate::error::{MixError, Result};
use crate::fractions::{
    solve_binder_water, BinderConstituent, BinderFractions, Component, ComponentRole,
    Fractions, MixConstituent, MixFractions,
};
use crate::grading::{self, Grading, GradingRow, GradingType};
use crate::material_catalog::{GradingStore, MaterialCatalog};
use crate::math_utils::round_to;
use crate::specific_gravity::{binder_specific_gravity, compose_cement, CementDensity};
use serde::Serialize;
use tracing::{debug, warn};

/// Water/binder ratio of a fresh session.
pub const DEFAULT_WATER_BINDER_RATIO: f64 = 0.45;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum AggregateSlot {
    Coarse1 = 0,
    Fine1 = 1,
    Coarse2 = 2,
    Fine2 = 3,
}

impl AggregateSlot {
    pub const COUNT: usize = 4;
    pub const ALL: [AggregateSlot; Self::COUNT] = [
        AggregateSlot::Coarse1,
        AggregateSlot::Fine1,
        AggregateSlot::Coarse2,
        AggregateSlot::Fine2,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> GradingType {
        match self {
            AggregateSlot::Coarse1 | AggregateSlot::Coarse2 => GradingType::Coarse,
            AggregateSlot::Fine1 | AggregateSlot::Fine2 => GradingType::Fine,
        }
    }

    pub fn constituent(self) -> MixConstituent {
        match self {
            AggregateSlot::Coarse1 => MixConstituent::Coarse1,
            AggregateSlot::Fine1 => MixConstituent::Fine1,
            AggregateSlot::Coarse2 => MixConstituent::Coarse2,
            AggregateSlot::Fine2 => MixConstituent::Fine2,
        }
    }
}

/// SCMs whose specific gravity depends on the chosen sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ScmSample {
    FlyAsh = 0,
    Slag = 1,
    InertFiller = 2,
}

impl ScmSample {
    pub const COUNT: usize = 3;

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn constituent(self) -> BinderConstituent {
        match self {
            ScmSample::FlyAsh => BinderConstituent::FlyAsh,
            ScmSample::Slag => BinderConstituent::Slag,
            ScmSample::InertFiller => BinderConstituent::InertFiller,
        }
    }

    fn fetch_sg(self, catalog: &dyn MaterialCatalog, sample: &str) -> Result<f64> {
        match self {
            ScmSample::FlyAsh => catalog.fly_ash_specific_gravity(sample),
            ScmSample::Slag => catalog.slag_specific_gravity(sample),
            ScmSample::InertFiller => catalog.inert_filler_specific_gravity(sample),
        }
    }

    fn for_constituent(c: BinderConstituent) -> Option<ScmSample> {
        match c {
            BinderConstituent::FlyAsh => Some(ScmSample::FlyAsh),
            BinderConstituent::Slag => Some(ScmSample::Slag),
            BinderConstituent::InertFiller => Some(ScmSample::InertFiller),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CementSelection {
    pub name: String,
    pub phases: ClinkerPhases,
    /// [dihydrate, hemihydrate, anhydrite] within the cement
    pub sulfates: [f64; 3],
    pub density: CementDensity,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleSelection {
    pub name: String,
    pub specific_gravity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateSelection {
    pub material: String,
    pub specific_gravity: f64,
    /// Mass fraction of the whole mix
    pub mass_fraction: f64,
    /// Active grading, held by value. Saved gradings never change under a
    /// name, so this is the same record the catalog returns for `grading.name`.
    pub grading: Option<Grading>,
}

/// One edit to the mix.
#[derive(Clone, Debug, PartialEq)]
pub enum MixChange {
    Cement(String),
    ScmSample { scm: ScmSample, sample: String },
    /// Mass fraction of an SCM within the binder; cement takes the rest
    BinderFraction { constituent: BinderConstituent, mass_fraction: f64 },
    /// Select (or, with `None`, disable) the aggregate material of a slot
    Aggregate { slot: AggregateSlot, material: Option<String> },
    AggregateFraction { slot: AggregateSlot, mass_fraction: f64 },
    Grading { slot: AggregateSlot, name: Option<String> },
    WaterBinderRatio(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixState {
    config: MixConfig,
    cement: Option<CementSelection>,
    samples: [Option<SampleSelection>; ScmSample::COUNT],
    /// Requested SCM mass fractions within the binder (cement entry unused)
    scm_fractions: [f64; BinderConstituent::COUNT],
    aggregates: [Option<AggregateSelection>; AggregateSlot::COUNT],
    target_water_binder_ratio: f64,

    // derived
    binder: BinderFractions,
    binder_sg: f64,
    mix: MixFractions,
    water_binder_ratio: f64,
    geometry: Option<DomainGeometry>,
}

impl Default for MixState {
    fn default() -> Self {
        Self::new(MixConfig::default())
    }
}

impl MixState {
    pub fn new(config: MixConfig) -> Self {
        MixState {
            config,
            cement: None,
            samples: Default::default(),
            scm_fractions: [0.0; BinderConstituent::COUNT],
            aggregates: Default::default(),
            target_water_binder_ratio: DEFAULT_WATER_BINDER_RATIO,
            binder: Fractions::default(),
            binder_sg: 0.0,
            mix: Fractions::default(),
            water_binder_ratio: 0.0,
            geometry: None,
        }
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    pub fn cement(&self) -> Option<&CementSelection> {
        self.cement.as_ref()
    }

    pub fn sample(&self, scm: ScmSample) -> Option<&SampleSelection> {
        self.samples[scm.as_index()].as_ref()
    }

    pub fn aggregate(&self, slot: AggregateSlot) -> Option<&AggregateSelection> {
        self.aggregates[slot.as_index()].as_ref()
    }

    /// Binder-internal fractions; all zero until a cement is chosen.
    pub fn binder(&self) -> &BinderFractions {
        &self.binder
    }

    pub fn binder_sg(&self) -> f64 {
        self.binder_sg
    }

    pub fn mix(&self) -> &MixFractions {
        &self.mix
    }

    /// Water/binder mass ratio derived from the current mix, three decimals.
    pub fn water_binder_ratio(&self) -> f64 {
        self.water_binder_ratio
    }

    pub fn target_water_binder_ratio(&self) -> f64 {
        self.target_water_binder_ratio
    }

    pub fn geometry(&self) -> Option<DomainGeometry> {
        self.geometry
    }

    /// True once fractions have been derived for a chosen cement.
    pub fn is_complete(&self) -> bool {
        self.cement.is_some() && self.binder_sg > 0.0
    }

    /// Every present constituent with fractions of the whole mix.
    pub fn components(&self) -> Vec<Component> {
        let mut out = Vec::new();
        if !self.is_complete() {
            return out;
        }

        let binder_mass = self.mix.mass_of(MixConstituent::Binder);
        let binder_volume = self.mix.volume_of(MixConstituent::Binder);
        for c in BinderConstituent::ALL {
            let mass = self.binder.mass_of(c);
            if mass <= 0.0 {
                continue;
            }
            out.push(Component {
                name: self.binder_constituent_name(c),
                role: c.role(),
                mass_fraction: round_to(binder_mass * mass, FRACTION_DECIMALS),
                volume_fraction: round_to(
                    binder_volume * self.binder.volume_of(c),
                    FRACTION_DECIMALS,
                ),
                specific_gravity: self.binder.sg_of(c),
            });
        }

        for slot in AggregateSlot::ALL {
            if let Some(agg) = self.aggregate(slot) {
                let c = slot.constituent();
                if agg.mass_fraction <= 0.0 {
                    continue;
                }
                out.push(Component {
                    name: agg.material.clone(),
                    role: c.role(),
                    mass_fraction: self.mix.mass_of(c),
                    volume_fraction: self.mix.volume_of(c),
                    specific_gravity: agg.specific_gravity,
                });
            }
        }

        out.push(Component {
            name: "water".to_string(),
            role: ComponentRole::Water,
            mass_fraction: self.mix.mass_of(MixConstituent::Water),
            volume_fraction: self.mix.volume_of(MixConstituent::Water),
            specific_gravity: self.config.specific_gravities.water,
        });
        out
    }

    fn binder_constituent_name(&self, c: BinderConstituent) -> String {
        if c == BinderConstituent::Cement {
            if let Some(cement) = &self.cement {
                return cement.name.clone();
            }
        }
        ScmSample::for_constituent(c)
            .and_then(|scm| self.sample(scm))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| c.label().to_string())
    }

    // ------------------------- steps -------------------------

    fn select_cement(&mut self, name: &str, catalog: &dyn MaterialCatalog) -> Result<()> {
        let phases = ClinkerPhases::parse(&catalog.pfc(name)?)?;
        let sulfates = catalog.sulfate_fractions(name)?;
        let density = compose_cement(&phases, sulfates, &self.config.specific_gravities)?;
        debug!(
            cement = name,
            alkali = phases.has_alkali(),
            clinker_sg = density.clinker_sg,
            cement_sg = density.cement_sg,
            "Cement composed"
        );
        self.cement = Some(CementSelection {
            name: name.to_string(),
            phases,
            sulfates,
            density,
        });
        Ok(())
    }

    fn select_sample(
        &mut self,
        scm: ScmSample,
        sample: &str,
        catalog: &dyn MaterialCatalog,
    ) -> Result<()> {
        if self.sample(scm).is_some_and(|s| s.name == sample) {
            debug!(?scm, sample, "Sample unchanged, keeping cached specific gravity");
            return Ok(());
        }
        let specific_gravity = scm.fetch_sg(catalog, sample)?;
        self.samples[scm.as_index()] = Some(SampleSelection {
            name: sample.to_string(),
            specific_gravity,
        });
        Ok(())
    }

    fn set_scm_fraction(&mut self, c: BinderConstituent, mass_fraction: f64) -> Result<()> {
        if c == BinderConstituent::Cement {
            return Err(MixError::out_of_range(
                "cement share of the binder is derived; set the SCM fraction",
                mass_fraction,
            ));
        }
        if !(0.0..=1.0).contains(&mass_fraction) {
            let what = format!("{} mass fraction", c.label());
            return Err(MixError::out_of_range(what, mass_fraction));
        }
        self.scm_fractions[c.as_index()] = mass_fraction;

        let scm_total: f64 = self.scm_fractions.iter().skip(1).sum();
        if scm_total >= 1.0 {
            return Err(MixError::out_of_range("total SCM mass fraction of the binder", scm_total));
        }
        Ok(())
    }

    fn select_aggregate(
        &mut self,
        slot: AggregateSlot,
        material: Option<&str>,
        catalog: &dyn MaterialCatalog,
    ) -> Result<()> {
        let i = slot.as_index();
        let Some(name) = material else {
            self.aggregates[i] = None;
            return Ok(());
        };
        let specific_gravity = catalog.aggregate_specific_gravity(name)?;
        let (mass_fraction, grading) = match self.aggregates[i].take() {
            Some(previous) => (previous.mass_fraction, previous.grading),
            None => (0.0, None),
        };
        self.aggregates[i] = Some(AggregateSelection {
            material: name.to_string(),
            specific_gravity,
            mass_fraction,
            grading,
        });
        Ok(())
    }

    fn set_aggregate_fraction(&mut self, slot: AggregateSlot, mass_fraction: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&mass_fraction) {
            return Err(MixError::out_of_range(format!("{slot:?} mass fraction"), mass_fraction));
        }
        let agg = self.aggregates[slot.as_index()]
            .as_mut()
            .ok_or_else(|| MixError::missing("aggregate", format!("{slot:?} (slot disabled)")))?;
        agg.mass_fraction = mass_fraction;

        let total = self.aggregate_total();
        if total >= 1.0 {
            return Err(MixError::out_of_range("total aggregate mass fraction", total));
        }
        Ok(())
    }

    fn aggregate_total(&self) -> f64 {
        self.aggregates.iter().flatten().map(|agg| agg.mass_fraction).sum()
    }

    fn select_grading(
        &mut self,
        slot: AggregateSlot,
        name: Option<&str>,
        catalog: &dyn MaterialCatalog,
    ) -> Result<()> {
        let Some(name) = name else {
            return self.set_grading(slot, None);
        };
        if self.aggregate(slot).is_none() {
            return Err(MixError::missing("aggregate", format!("{slot:?} (slot disabled)")));
        }
        let kind = catalog.grading_type(name)?;
        if kind != slot.kind() {
            return Err(MixError::invalid_grading(
                name,
                format!("a {} grading cannot fill the {slot:?} slot", kind.as_str()),
            ));
        }
        let grading = Grading::parse(
            name,
            kind,
            catalog.grading_max_diameter(name)?,
            &catalog.grading(name)?,
        )?;
        self.set_grading(slot, Some(grading))
    }

    fn set_grading(&mut self, slot: AggregateSlot, grading: Option<Grading>) -> Result<()> {
        let agg = self.aggregates[slot.as_index()]
            .as_mut()
            .ok_or_else(|| MixError::missing("aggregate", format!("{slot:?} (slot disabled)")))?;
        agg.grading = grading;
        Ok(())
    }

    fn set_water_binder_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(MixError::out_of_range("water/binder ratio", ratio));
        }
        self.target_water_binder_ratio = ratio;
        Ok(())
    }

    fn binder_specific_gravities(&self, cement_sg: f64) -> Result<[f64; BinderConstituent::COUNT]> {
        let table = &self.config.specific_gravities;
        let mut sgs = [INACTIVE_SLOT_SG; BinderConstituent::COUNT];
        for c in BinderConstituent::ALL {
            if let Some(scm) = ScmSample::for_constituent(c) {
                sgs[c.as_index()] = match self.sample(scm) {
                    Some(s) => s.specific_gravity,
                    None if self.scm_fractions[c.as_index()] > 0.0 => {
                        return Err(MixError::missing(c.label(), "(no sample selected)"));
                    }
                    None => INACTIVE_SLOT_SG,
                };
                continue;
            }
            sgs[c.as_index()] = match c {
                BinderConstituent::Cement => cement_sg,
                BinderConstituent::SilicaFume => table.silica_fume,
                BinderConstituent::CaCO3 => table.caco3,
                BinderConstituent::FreeLime => table.free_lime,
                _ => INACTIVE_SLOT_SG,
            };
        }
        Ok(sgs)
    }

    /// Steps 2–4: binder-internal pass, binder SG, mix-level pass.
    fn refresh_fractions(&mut self) -> Result<()> {
        let Some(cement) = &self.cement else {
            debug!("No cement selected, fractions left underived");
            return Ok(());
        };
        let cement_sg = cement.density.cement_sg;
        let tolerance = self.config.fraction_tolerance;

        let mut binder_mass = self.scm_fractions;
        binder_mass[BinderConstituent::Cement.as_index()] =
            1.0 - self.scm_fractions.iter().skip(1).sum::<f64>();
        let binder = BinderFractions::from_mass(
            "binder",
            binder_mass,
            self.binder_specific_gravities(cement_sg)?,
            tolerance,
        )?;

        let binder_sg = round_to(
            binder_specific_gravity(
                binder.volume_of(BinderConstituent::Cement),
                binder.mass_of(BinderConstituent::Cement),
                cement_sg,
            ),
            FRACTION_DECIMALS,
        );
        debug!(binder_sg, "Binder pass complete");

        let mut mass = [0.0; MixConstituent::COUNT];
        let mut sgs = [INACTIVE_SLOT_SG; MixConstituent::COUNT];
        let mut aggregate_total = 0.0;
        for slot in AggregateSlot::ALL {
            if let Some(agg) = self.aggregate(slot) {
                let i = slot.constituent().as_index();
                mass[i] = agg.mass_fraction;
                sgs[i] = agg.specific_gravity;
                aggregate_total += agg.mass_fraction;
            }
        }
        let (binder_fraction, water_fraction) =
            solve_binder_water(aggregate_total, self.target_water_binder_ratio)?;
        mass[MixConstituent::Binder.as_index()] = binder_fraction;
        mass[MixConstituent::Water.as_index()] = water_fraction;
        sgs[MixConstituent::Binder.as_index()] = binder_sg;
        sgs[MixConstituent::Water.as_index()] = self.config.specific_gravities.water;

        let mix = MixFractions::from_mass("mix", mass, sgs, tolerance)?;
        self.water_binder_ratio = mix.water_binder_ratio()?;
        debug!(
            water_binder_ratio = self.water_binder_ratio,
            aggregate_total, "Mix pass complete"
        );

        self.binder = binder.rounded();
        self.binder_sg = binder_sg;
        self.mix = mix.rounded();
        Ok(())
    }

    fn active_gradings(&self) -> Vec<&Grading> {
        self.aggregates
            .iter()
            .flatten()
            .filter_map(|agg| agg.grading.as_ref())
            .collect()
    }

    fn refresh_geometry(&mut self) -> Result<()> {
        let active = self.active_gradings();
        self.geometry = if active.is_empty() {
            None
        } else {
            Some(domain_geometry::auto_size(&active)?)
        };
        Ok(())
    }

    fn apply(&mut self, change: &MixChange, catalog: &dyn MaterialCatalog) -> Result<()> {
        match change {
            MixChange::Cement(name) => {
                self.select_cement(name, catalog)?;
                self.refresh_fractions()
            }
            MixChange::ScmSample { scm, sample } => {
                self.select_sample(*scm, sample, catalog)?;
                self.refresh_fractions()
            }
            MixChange::BinderFraction {
                constituent,
                mass_fraction,
            } => {
                self.set_scm_fraction(*constituent, *mass_fraction)?;
                self.refresh_fractions()
            }
            MixChange::Aggregate { slot, material } => {
                self.select_aggregate(*slot, material.as_deref(), catalog)?;
                self.refresh_fractions()?;
                self.refresh_geometry()
            }
            MixChange::AggregateFraction {
                slot,
                mass_fraction,
            } => {
                self.set_aggregate_fraction(*slot, *mass_fraction)?;
                self.refresh_fractions()
            }
            MixChange::Grading { slot, name } => {
                self.select_grading(*slot, name.as_deref(), catalog)?;
                self.refresh_fractions()?;
                self.refresh_geometry()
            }
            MixChange::WaterBinderRatio(ratio) => {
                self.set_water_binder_ratio(*ratio)?;
                self.refresh_fractions()
            }
        }
    }
}

/// Apply one change and return the resulting snapshot.
///
/// On error the input snapshot is the state to keep; nothing is partially applied.
pub fn recompute(
    state: &MixState,
    change: MixChange,
    catalog: &dyn MaterialCatalog,
) -> Result<MixState> {
    debug!(?change, "Recomputing mix");
    let mut next = state.clone();
    match next.apply(&change, catalog) {
        Ok(()) => Ok(next),
        Err(e) => {
            warn!(?change, error = %e, "Mix change rejected");
            Err(e)
        }
    }
}

/// Validate an edited grading, activate it in `slot`, and persist it under `name`.
///
/// The grading is saved only once the resulting mix is known to be valid, so a
/// rejected grading is never stored.
pub fn stage_grading(
    state: &MixState,
    slot: AggregateSlot,
    name: &str,
    rows: Vec<GradingRow>,
    max_diameter: f64,
    store: &dyn GradingStore,
) -> Result<MixState> {
    let staged = Grading::new(name, slot.kind(), max_diameter, rows.clone())?;

    let mut next = state.clone();
    next.set_grading(slot, Some(staged))?;
    next.refresh_geometry()?;

    grading::save_grading(store, name, slot.kind(), rows, max_diameter)?;
    Ok(next)
}
