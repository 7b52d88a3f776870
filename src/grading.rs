//! Aggregate gradings (sieve curves).
//!
//! Text form, one row per sieve from the largest opening down:
//!
//! ```text
//! Sieve   Cumulative  Retained
//! 19000   0.05        0.05
//! 12500   0.40        0.35
//! ```
//!
//! Columns are diameter, cumulative fraction and the mass fraction retained
//! on that sieve (tab or space separated). Two-column rows (diameter,
//! retained) are accepted and get a running cumulative column. A first line
//! whose first token is not a number is a header and is skipped.

use crate::error::{MixError, Result};
use crate::material_catalog::GradingStore;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingType {
    Coarse,
    Fine,
}

impl GradingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingType::Coarse => "coarse",
            GradingType::Fine => "fine",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingRow {
    pub diameter: f64,
    pub cumulative_fraction: f64,
    pub mass_fraction: f64,
}

impl GradingRow {
    pub fn new(diameter: f64, cumulative_fraction: f64, mass_fraction: f64) -> Self {
        GradingRow {
            diameter,
            cumulative_fraction,
            mass_fraction,
        }
    }

    pub fn is_present(&self) -> bool {
        self.mass_fraction > 0.0
    }
}

/// Largest and smallest particle diameters actually present in a grading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SieveExtremes {
    pub largest: f64,
    pub smallest: f64,
}

impl SieveExtremes {
    pub fn merge(self, other: SieveExtremes) -> SieveExtremes {
        SieveExtremes {
            largest: self.largest.max(other.largest),
            smallest: self.smallest.min(other.smallest),
        }
    }
}

/// A validated, immutable particle-size distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grading {
    pub name: String,
    pub kind: GradingType,
    /// Opening of the notional sieve above the first row
    pub max_diameter: f64,
    pub rows: Vec<GradingRow>,
}

fn parse_number(token: &str, line: usize) -> Result<f64> {
    let value: f64 = token
        .parse()
        .map_err(|_| MixError::malformed_grading(line, format!("'{token}' is not a number")))?;
    if !value.is_finite() {
        return Err(MixError::malformed_grading(line, format!("'{token}' is not finite")));
    }
    Ok(value)
}

/// Parse grading text into rows. Only the row format is checked here;
/// ordering and value rules are enforced by [`Grading::new`].
pub fn parse_rows(text: &str) -> Result<Vec<GradingRow>> {
    let mut rows = Vec::new();
    let mut running = 0.0;
    let mut first = true;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let header = first && tokens[0].parse::<f64>().is_err();
        first = false;
        if header {
            continue;
        }

        let row = match tokens.as_slice() {
            [d, retained] => {
                let mass_fraction = parse_number(retained, line)?;
                running += mass_fraction;
                GradingRow::new(parse_number(d, line)?, running, mass_fraction)
            }
            [d, cumulative, retained, ..] => GradingRow::new(
                parse_number(d, line)?,
                parse_number(cumulative, line)?,
                parse_number(retained, line)?,
            ),
            _ => {
                return Err(MixError::malformed_grading(
                    line,
                    "expected diameter and mass fraction columns",
                ));
            }
        };
        rows.push(row);
    }

    Ok(rows)
}

impl Grading {
    /// Validate rows into a grading.
    ///
    /// Rejects empty gradings, non-decreasing diameters, negative values, a
    /// maximum diameter that does not sit above the first row, and gradings
    /// with no retained mass at all.
    pub fn new(
        name: impl Into<String>,
        kind: GradingType,
        max_diameter: f64,
        rows: Vec<GradingRow>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MixError::invalid_grading(name, "name is blank"));
        }
        let Some(first) = rows.first() else {
            return Err(MixError::invalid_grading(name, "no sieve rows"));
        };
        if !(max_diameter.is_finite() && max_diameter > first.diameter) {
            return Err(MixError::invalid_grading(
                name,
                format!(
                    "maximum diameter {max_diameter} must exceed the first sieve {}",
                    first.diameter
                ),
            ));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.diameter < 0.0 || row.cumulative_fraction < 0.0 || row.mass_fraction < 0.0 {
                return Err(MixError::invalid_grading(
                    name,
                    format!("row {} has a negative value", i + 1),
                ));
            }
            if i > 0 && row.diameter >= rows[i - 1].diameter {
                return Err(MixError::invalid_grading(
                    name,
                    format!(
                        "row {} diameter {} is not smaller than {}",
                        i + 1,
                        row.diameter,
                        rows[i - 1].diameter
                    ),
                ));
            }
        }

        if !rows.iter().any(GradingRow::is_present) {
            return Err(MixError::EmptyGrading(name));
        }

        Ok(Grading {
            name,
            kind,
            max_diameter,
            rows,
        })
    }

    pub fn parse(
        name: impl Into<String>,
        kind: GradingType,
        max_diameter: f64,
        text: &str,
    ) -> Result<Self> {
        Self::new(name, kind, max_diameter, parse_rows(text)?)
    }

    /// Same rows under a new name, for staging an edited copy.
    pub fn renamed(&self, name: impl Into<String>, rows: Vec<GradingRow>) -> Result<Self> {
        Self::new(name, self.kind, self.max_diameter, rows)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("Sieve\tCumulative\tRetained\n");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{}\t{}\t{}",
                row.diameter, row.cumulative_fraction, row.mass_fraction
            );
        }
        out
    }

    /// Upper bound of the largest particles: the opening just above the first
    /// sieve that retains mass, or `max_diameter` if that is the top sieve.
    pub fn largest_present_diameter(&self) -> f64 {
        match self.rows.iter().position(GradingRow::is_present) {
            Some(0) | None => self.max_diameter,
            Some(k) => self.rows[k - 1].diameter,
        }
    }

    /// Opening of the bottom-most sieve that retains mass.
    pub fn smallest_present_diameter(&self) -> f64 {
        self.rows
            .iter()
            .rev()
            .find(|r| r.is_present())
            .map(|r| r.diameter)
            .unwrap_or(self.max_diameter)
    }

    pub fn extremes(&self) -> SieveExtremes {
        SieveExtremes {
            largest: self.largest_present_diameter(),
            smallest: self.smallest_present_diameter(),
        }
    }
}

/// Validate a grading and persist it under a name that must not exist yet.
pub fn save_grading(
    store: &dyn GradingStore,
    name: &str,
    kind: GradingType,
    rows: Vec<GradingRow>,
    max_diameter: f64,
) -> Result<Grading> {
    let grading = Grading::new(name, kind, max_diameter, rows)?;
    match store.save_grading(&grading) {
        Ok(()) => {
            info!(
                name = %grading.name,
                kind = grading.kind.as_str(),
                rows = grading.rows.len(),
                "Grading saved"
            );
            Ok(grading)
        }
        Err(e) => {
            warn!(name = %grading.name, error = %e, "Grading not saved");
            Err(e)
        }
    }
}
