//! Clinker phase fractions of a cement.
//!
//! A cement's correlation data supplies a phase-fraction record: one row per
//! clinker phase, in the fixed order C3S, C2S, C3A, C4AF and, when alkali
//! correlation data exists, K2SO4 and Na2SO4. Each row holds the phase's
//! volume fraction and surface-area fraction within the clinker.

use crate::config::PhaseSpecificGravities;
use crate::error::{MixError, Result};
use crate::phase_registry;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ClinkerPhase {
    C3S = 0,
    C2S = 1,
    C3A = 2,
    C4AF = 3,
    K2SO4 = 4,
    Na2SO4 = 5,
}

impl ClinkerPhase {
    pub const COUNT: usize = 6;
    pub const ALL: [ClinkerPhase; Self::COUNT] = [
        ClinkerPhase::C3S,
        ClinkerPhase::C2S,
        ClinkerPhase::C3A,
        ClinkerPhase::C4AF,
        ClinkerPhase::K2SO4,
        ClinkerPhase::Na2SO4,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }

    pub fn is_alkali(self) -> bool {
        matches!(self, ClinkerPhase::K2SO4 | ClinkerPhase::Na2SO4)
    }

    /// Name of the phase in the phase registry
    pub fn registry_name(self) -> &'static str {
        match self {
            ClinkerPhase::C3S => "C3S",
            ClinkerPhase::C2S => "C2S",
            ClinkerPhase::C3A => "C3A",
            ClinkerPhase::C4AF => "C4AF",
            ClinkerPhase::K2SO4 => "K2SO4",
            ClinkerPhase::Na2SO4 => "NA2SO4",
        }
    }

    pub fn phase_number(self) -> Option<u8> {
        phase_registry::number_of(self.registry_name())
    }

    pub fn specific_gravity(self, table: &PhaseSpecificGravities) -> f64 {
        match self {
            ClinkerPhase::C3S => table.c3s,
            ClinkerPhase::C2S => table.c2s,
            ClinkerPhase::C3A => table.c3a,
            ClinkerPhase::C4AF => table.c4af,
            ClinkerPhase::K2SO4 => table.k2so4,
            ClinkerPhase::Na2SO4 => table.na2so4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PhaseFraction {
    pub volume_fraction: f64,
    pub surface_fraction: f64,
}

/// Volume and surface-area fractions of every clinker phase of one cement.
///
/// Alkali phases are always present in the table; when the cement has no
/// alkali correlation data their fractions stay at zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClinkerPhases {
    fractions: [PhaseFraction; ClinkerPhase::COUNT],
    has_alkali: bool,
}

impl ClinkerPhases {
    /// Parse a phase-fraction record (`<volume><delim><surface>` per line).
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::with_capacity(ClinkerPhase::COUNT);

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line
                .split(|c: char| c == '\t' || c == ' ' || c == ',')
                .filter(|t| !t.is_empty());

            let mut next_value = |what: &str| -> Result<f64> {
                let token = tokens.next().ok_or_else(|| MixError::MalformedPhaseFractions {
                    line: i + 1,
                    reason: format!("missing {what}"),
                })?;
                let value: f64 = token.parse().map_err(|_| MixError::MalformedPhaseFractions {
                    line: i + 1,
                    reason: format!("'{token}' is not a number"),
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(MixError::MalformedPhaseFractions {
                        line: i + 1,
                        reason: format!("{what} {value} outside [0, 1]"),
                    });
                }
                Ok(value)
            };

            let volume_fraction = next_value("volume fraction")?;
            let surface_fraction = next_value("surface fraction")?;
            rows.push((
                i + 1,
                PhaseFraction {
                    volume_fraction,
                    surface_fraction,
                },
            ));
        }

        let has_alkali = match rows.len() {
            4 => false,
            6 => true,
            n => {
                let line = rows.last().map(|(l, _)| *l).unwrap_or(0);
                return Err(MixError::MalformedPhaseFractions {
                    line,
                    reason: format!("expected 4 or 6 phase rows, found {n}"),
                });
            }
        };

        let mut fractions = [PhaseFraction::default(); ClinkerPhase::COUNT];
        for (slot, (_, row)) in fractions.iter_mut().zip(rows) {
            *slot = row;
        }
        Self::from_fractions(fractions, has_alkali)
    }

    /// Build from explicit fractions; alkali entries are zeroed when `has_alkali` is false.
    pub fn from_fractions(
        mut fractions: [PhaseFraction; ClinkerPhase::COUNT],
        has_alkali: bool,
    ) -> Result<Self> {
        if !has_alkali {
            fractions[ClinkerPhase::K2SO4.as_index()] = PhaseFraction::default();
            fractions[ClinkerPhase::Na2SO4.as_index()] = PhaseFraction::default();
        }

        let volume_sum: f64 = fractions.iter().map(|f| f.volume_fraction).sum();
        if volume_sum > 1.0 + crate::constants::FRACTION_SUM_TOLERANCE {
            return Err(MixError::MalformedPhaseFractions {
                line: 0,
                reason: format!("clinker volume fractions sum to {volume_sum:.4} (> 1)"),
            });
        }
        if volume_sum <= 0.0 {
            return Err(MixError::EmptyComposition("clinker".to_string()));
        }

        Ok(ClinkerPhases {
            fractions,
            has_alkali,
        })
    }

    pub fn has_alkali(&self) -> bool {
        self.has_alkali
    }

    pub fn get(&self, phase: ClinkerPhase) -> PhaseFraction {
        self.fractions[phase.as_index()]
    }

    pub fn volume_fractions(&self) -> [f64; ClinkerPhase::COUNT] {
        self.fractions.map(|f| f.volume_fraction)
    }

    pub fn surface_fractions(&self) -> [f64; ClinkerPhase::COUNT] {
        self.fractions.map(|f| f.surface_fraction)
    }

    /// Phases that participate in the clinker, in record order.
    pub fn present(&self) -> impl Iterator<Item = (ClinkerPhase, PhaseFraction)> + '_ {
        ClinkerPhase::ALL
            .into_iter()
            .filter(|p| self.has_alkali || !p.is_alkali())
            .map(|p| (p, self.get(p)))
    }
}
