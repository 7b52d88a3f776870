use crate::constants::*;
use crate::error::{MixError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the material catalog document
pub static DEFAULT_CATALOG_PATH: Lazy<PathBuf> = Lazy::new(|| PathBuf::from("src/catalog.json"));

/// Intrinsic specific gravities of the phases whose density is not sample dependent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSpecificGravities {
    pub c3s: f64,
    pub c2s: f64,
    pub c3a: f64,
    pub c4af: f64,
    pub k2so4: f64,
    pub na2so4: f64,
    pub gypsum: f64,
    pub hemihydrate: f64,
    pub anhydrite: f64,
    pub silica_fume: f64,
    pub caco3: f64,
    pub free_lime: f64,
    pub water: f64,
}

impl Default for PhaseSpecificGravities {
    fn default() -> Self {
        Self {
            c3s: SG_C3S,
            c2s: SG_C2S,
            c3a: SG_C3A,
            c4af: SG_C4AF,
            k2so4: SG_K2SO4,
            na2so4: SG_NA2SO4,
            gypsum: SG_GYPSUM,
            hemihydrate: SG_HEMIHYDRATE,
            anhydrite: SG_ANHYDRITE,
            silica_fume: SG_SILICA_FUME,
            caco3: SG_CACO3,
            free_lime: SG_FREE_LIME,
            water: SG_WATER,
        }
    }
}

impl PhaseSpecificGravities {
    /// [dihydrate, hemihydrate, anhydrite]
    pub fn sulfates(&self) -> [f64; 3] {
        [self.gypsum, self.hemihydrate, self.anhydrite]
    }

    fn entries(&self) -> [(&'static str, f64); 13] {
        [
            ("c3s", self.c3s),
            ("c2s", self.c2s),
            ("c3a", self.c3a),
            ("c4af", self.c4af),
            ("k2so4", self.k2so4),
            ("na2so4", self.na2so4),
            ("gypsum", self.gypsum),
            ("hemihydrate", self.hemihydrate),
            ("anhydrite", self.anhydrite),
            ("silica_fume", self.silica_fume),
            ("caco3", self.caco3),
            ("free_lime", self.free_lime),
            ("water", self.water),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, sg) in self.entries() {
            if !(sg > 0.0 && sg.is_finite()) {
                return Err(MixError::invalid_sg(name, sg));
            }
        }
        Ok(())
    }
}

/// Settings of one mix editing session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub specific_gravities: PhaseSpecificGravities,
    /// Allowed deviation of a mass fraction sum from 1.0
    pub fraction_tolerance: f64,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            specific_gravities: PhaseSpecificGravities::default(),
            fraction_tolerance: FRACTION_SUM_TOLERANCE,
        }
    }
}

impl MixConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MixConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.specific_gravities.validate()?;
        if !(self.fraction_tolerance >= 0.0 && self.fraction_tolerance < 0.1) {
            return Err(MixError::out_of_range(
                "fraction tolerance",
                self.fraction_tolerance,
            ));
        }
        Ok(())
    }
}
