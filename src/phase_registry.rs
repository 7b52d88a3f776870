use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One row of the phase table: id, display name, property key and HTML markup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEntry {
    pub number: u8,
    pub name: &'static str,
    pub property_key: &'static str,
    pub markup: &'static str,
}

const fn entry(
    number: u8,
    name: &'static str,
    property_key: &'static str,
    markup: &'static str,
) -> PhaseEntry {
    PhaseEntry {
        number,
        name,
        property_key,
        markup,
    }
}

/// Microstructure phases, in id order.
pub static PHASES: [PhaseEntry; 38] = [
    entry(0, "POROSITY", "porosity", "Porosity"),
    entry(1, "C3S", "c3s", "C<sub>3</sub>S"),
    entry(2, "C2S", "c2s", "C<sub>2</sub>S"),
    entry(3, "C3A", "c3a", "C<sub>3</sub>A"),
    entry(4, "C4AF", "c4af", "C<sub>4</sub>AF"),
    entry(5, "K2SO4", "k2so4", "K<sub>2</sub>SO<sub>4</sub>"),
    entry(6, "NA2SO4", "na2so4", "Na<sub>2</sub>SO<sub>4</sub>"),
    entry(7, "GYPSUM", "gypsum", "CSH<sub>2</sub>"),
    entry(8, "HEMIHYD", "hemihydrate", "CSH<sub>0.5</sub>"),
    entry(9, "ANHYDRITE", "anhydrite", "CS"),
    entry(10, "SFUME", "silica_fume", "Silica fume"),
    entry(11, "INERT", "inert", "Inert filler"),
    entry(12, "SLAG", "slag", "Slag"),
    entry(13, "INERTAGG", "inert_aggregate", "Aggregate"),
    entry(14, "ASG", "aluminosilicate_glass", "Aluminosilicate glass"),
    entry(15, "CAS2", "cas2", "CAS<sub>2</sub>"),
    entry(16, "AMSIL", "amorphous_silica", "Amorphous silica"),
    entry(17, "FAC3A", "fly_ash_c3a", "Fly ash C<sub>3</sub>A"),
    entry(18, "FLYASH", "fly_ash", "Fly ash"),
    entry(19, "CH", "ch", "CH"),
    entry(20, "CSH", "csh", "C-S-H"),
    entry(21, "C3AH6", "c3ah6", "C<sub>3</sub>AH<sub>6</sub>"),
    entry(22, "ETTR", "ettringite", "Ettringite"),
    entry(23, "ETTRC4AF", "iron_ettringite", "Iron-rich ettringite"),
    entry(24, "AFM", "afm", "AFm"),
    entry(25, "FH3", "fh3", "FH<sub>3</sub>"),
    entry(26, "POZZCSH", "pozzolanic_csh", "Pozzolanic C-S-H"),
    entry(27, "SLAGCSH", "slag_csh", "Slag C-S-H"),
    entry(28, "CACL2", "cacl2", "CaCl<sub>2</sub>"),
    entry(29, "FRIEDEL", "friedels_salt", "Friedel's salt"),
    entry(30, "STRAT", "stratlingite", "Stratlingite"),
    entry(31, "GYPSUMS", "secondary_gypsum", "Secondary gypsum"),
    entry(32, "CACO3", "caco3", "CaCO<sub>3</sub>"),
    entry(33, "AFMC", "afmc", "Carboaluminate"),
    entry(34, "BRUCITE", "brucite", "Brucite"),
    entry(35, "MS", "ms", "MS"),
    entry(36, "FREELIME", "free_lime", "Free lime"),
    entry(37, "OC3A", "orthorhombic_c3a", "Orthorhombic C<sub>3</sub>A"),
];

/// Index of both names and property keys into `PHASES`.
static BY_LABEL: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (i, phase) in PHASES.iter().enumerate() {
        m.insert(phase.name, i);
        m.insert(phase.property_key, i);
    }
    m
});

static BY_NAME: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    PHASES
        .iter()
        .enumerate()
        .map(|(i, phase)| (phase.name, i))
        .collect()
});

static BY_KEY: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    PHASES
        .iter()
        .enumerate()
        .map(|(i, phase)| (phase.property_key, i))
        .collect()
});

/// Fast O(1) lookup by id; ids are dense from zero.
pub fn entry_for_number(number: u8) -> Option<&'static PhaseEntry> {
    PHASES.get(number as usize)
}

pub fn entry_for_label(name_or_key: &str) -> Option<&'static PhaseEntry> {
    BY_LABEL.get(name_or_key).map(|&i| &PHASES[i])
}

/// Phase id for a canonical name or a property key.
pub fn number_of(name_or_key: &str) -> Option<u8> {
    entry_for_label(name_or_key).map(|p| p.number)
}

pub fn name_of(number: u8) -> Option<&'static str> {
    entry_for_number(number).map(|p| p.name)
}

pub fn name_of_key(property_key: &str) -> Option<&'static str> {
    BY_KEY.get(property_key).map(|&i| PHASES[i].name)
}

pub fn property_key_of(number: u8) -> Option<&'static str> {
    entry_for_number(number).map(|p| p.property_key)
}

pub fn property_key_of_name(name: &str) -> Option<&'static str> {
    BY_NAME.get(name).map(|&i| PHASES[i].property_key)
}

pub fn markup_of(number: u8) -> Option<&'static str> {
    entry_for_number(number).map(|p| p.markup)
}

pub fn markup_of_name(name: &str) -> Option<&'static str> {
    BY_NAME.get(name).map(|&i| PHASES[i].markup)
}

pub fn all_numbers() -> impl Iterator<Item = u8> {
    PHASES.iter().map(|p| p.number)
}

pub fn all_names() -> impl Iterator<Item = &'static str> {
    PHASES.iter().map(|p| p.name)
}
