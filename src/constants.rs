// Specific gravities of the fixed clinker and set-control phases (g/cm³, relative to water)
pub const SG_C3S: f64 = 3.21;
pub const SG_C2S: f64 = 3.28;
pub const SG_C3A: f64 = 3.03;
pub const SG_C4AF: f64 = 3.73;
pub const SG_K2SO4: f64 = 2.66;
pub const SG_NA2SO4: f64 = 2.68;

pub const SG_GYPSUM: f64 = 2.32; // dihydrate
pub const SG_HEMIHYDRATE: f64 = 2.74;
pub const SG_ANHYDRITE: f64 = 2.61;

// Binder additions whose density does not depend on the sample
pub const SG_SILICA_FUME: f64 = 2.22;
pub const SG_CACO3: f64 = 2.71;
pub const SG_FREE_LIME: f64 = 3.31;

pub const SG_WATER: f64 = 1.0;

/// Stand-in specific gravity for a slot that is not part of the mix.
/// It only ever multiplies a zero mass fraction.
pub const INACTIVE_SLOT_SG: f64 = 1.0;

// Domain auto-sizing.
// edge = largest present sieve / SIZE_SAFETY_COEFFICIENT, i.e. the box spans
// at least five of the largest particles.
pub const SIZE_SAFETY_COEFFICIENT: f64 = 0.2;
// resolution = smallest present sieve / RESOLUTION_SAFETY_COEFFICIENT
pub const RESOLUTION_SAFETY_COEFFICIENT: f64 = 3.0;

// Rounding precision (decimal places) of persisted values
pub const FRACTION_DECIMALS: u32 = 4;
pub const RATIO_DECIMALS: u32 = 3;
pub const GEOMETRY_DECIMALS: u32 = 2;

/// Allowed deviation of a mass or volume fraction sum from 1.0.
pub const FRACTION_SUM_TOLERANCE: f64 = 0.0005;

/// Absolute slack used when comparing already-rounded geometry values.
pub const GEOMETRY_EPSILON: f64 = 1e-9;
