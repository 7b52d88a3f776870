// Grading persistence tests
// Saved gradings must be readable through the catalog and names must stay unique

use std::sync::Arc;
use std::thread;

use vcctl_mix::grading::{Grading, GradingRow, GradingType, save_grading};
use vcctl_mix::material_catalog::{JsonMaterialCatalog, MaterialCatalog};
use vcctl_mix::{AggregateSlot, MixChange, MixError, MixState, recompute, stage_grading};

const FIXTURE: &str = r#"{
    "cements": {
        "opc": {
            "pfc": "0.60,0.55\n0.15,0.14\n0.10,0.16\n0.08,0.09\n",
            "sulfates": {"dihydrate": 0.04, "hemihydrate": 0.01}
        }
    },
    "aggregates": {
        "River gravel": {"specific_gravity": 2.6},
        "Quartz sand": {"specific_gravity": 2.65}
    },
    "gradings": {
        "base coarse": {
            "type": "coarse",
            "max_diameter": 25000,
            "text": "19000 0.0\n12500 0.5\n9500 0.5\n"
        },
        "torn": {"type": "fine", "max_diameter": 4750, "text": "2360 0.5\n600 half\n"}
    }
}"#;

fn fixture(key: &str) -> JsonMaterialCatalog {
    JsonMaterialCatalog::load_str(key, FIXTURE).unwrap()
}

fn sand_rows() -> Vec<GradingRow> {
    vec![
        GradingRow::new(2360.0, 0.1, 0.1),
        GradingRow::new(1180.0, 0.4, 0.3),
        GradingRow::new(600.0, 0.8, 0.4),
        GradingRow::new(300.0, 1.0, 0.2),
    ]
}

#[test]
fn test_saved_grading_round_trips_through_catalog() {
    let catalog = fixture("persist_round_trip");
    let saved = save_grading(&catalog, "lab sand", GradingType::Fine, sand_rows(), 4750.0).unwrap();

    let max = catalog.grading_max_diameter("lab sand").unwrap();
    let text = catalog.grading("lab sand").unwrap();
    let reloaded = Grading::parse("lab sand", GradingType::Fine, max, &text).unwrap();
    assert_eq!(reloaded, saved, "reloaded grading should match what was saved");
}

#[test]
fn test_duplicate_name_keeps_first_record() {
    let catalog = fixture("persist_duplicate");
    save_grading(&catalog, "lab sand", GradingType::Fine, sand_rows(), 4750.0).unwrap();

    let other = vec![GradingRow::new(1180.0, 1.0, 1.0)];
    let second = save_grading(&catalog, "lab sand", GradingType::Fine, other, 2360.0);
    assert!(matches!(second, Err(MixError::DuplicateGrading(ref name)) if name == "lab sand"));
    assert_eq!(catalog.grading_max_diameter("lab sand").unwrap(), 4750.0);

    // names from the source document are taken too
    let existing = save_grading(&catalog, "base coarse", GradingType::Fine, sand_rows(), 4750.0);
    assert!(matches!(existing, Err(MixError::DuplicateGrading(_))));
}

#[test]
fn test_invalid_grading_is_never_stored() {
    let catalog = fixture("persist_invalid");
    let unordered = vec![GradingRow::new(600.0, 0.5, 0.5), GradingRow::new(1180.0, 1.0, 0.5)];
    assert!(save_grading(&catalog, "unordered", GradingType::Fine, unordered, 4750.0).is_err());
    assert!(matches!(
        catalog.grading("unordered"),
        Err(MixError::MissingMaterial { kind: "grading", .. })
    ));
}

#[test]
fn test_concurrent_saves() {
    let catalog = Arc::new(fixture("persist_concurrent"));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                // half the threads race for one name, the rest use their own
                let name = if i % 2 == 0 { "contested".to_string() } else { format!("own {i}") };
                let rows = sand_rows();
                save_grading(catalog.as_ref(), &name, GradingType::Fine, rows, 4750.0).is_ok()
            })
        })
        .collect();
    let saved = handles.into_iter().filter_map(|h| h.join().ok()).filter(|ok| *ok).count();

    assert_eq!(saved, 9, "one contested save plus eight distinct names");
    let snapshot = catalog.snapshot();
    assert!(snapshot.gradings.contains_key("contested"));
    assert!((1..16).step_by(2).all(|i| snapshot.gradings.contains_key(&format!("own {i}"))));
}

#[test]
fn test_saved_gradings_survive_json_export() {
    let catalog = fixture("persist_export");
    save_grading(&catalog, "lab sand", GradingType::Fine, sand_rows(), 4750.0).unwrap();

    let exported = catalog.to_json().unwrap();
    let reopened = JsonMaterialCatalog::load_str("persist_export_reopened", &exported).unwrap();
    assert_eq!(reopened.grading("lab sand").unwrap(), catalog.grading("lab sand").unwrap());
    assert_eq!(reopened.aggregate_specific_gravity("River gravel").unwrap(), 2.6);
}

#[test]
fn test_stage_modified_copy() {
    let catalog = fixture("persist_stage");
    let state = [
        MixChange::Cement("opc".into()),
        MixChange::Aggregate {
            slot: AggregateSlot::Coarse1,
            material: Some("River gravel".into()),
        },
        MixChange::AggregateFraction { slot: AggregateSlot::Coarse1, mass_fraction: 0.5 },
        MixChange::Grading { slot: AggregateSlot::Coarse1, name: Some("base coarse".into()) },
    ]
    .into_iter()
    .try_fold(MixState::default(), |s, change| recompute(&s, change, &catalog))
    .unwrap();
    let base = state.aggregate(AggregateSlot::Coarse1).unwrap().grading.clone().unwrap();
    let before = state.geometry().unwrap();

    // shift everything onto the finer sieves
    let rows = vec![
        GradingRow::new(19000.0, 0.0, 0.0),
        GradingRow::new(12500.0, 0.0, 0.0),
        GradingRow::new(9500.0, 1.0, 1.0),
    ];
    let edited = base.renamed("finer coarse", rows.clone()).unwrap();
    let staged = stage_grading(
        &state,
        AggregateSlot::Coarse1,
        &edited.name,
        rows,
        edited.max_diameter,
        &catalog,
    )
    .unwrap();

    let active = staged.aggregate(AggregateSlot::Coarse1).unwrap().grading.as_ref().unwrap();
    assert_eq!(active.name, "finer coarse");
    assert!(staged.geometry().unwrap().edge_length < before.edge_length);
    assert!(catalog.grading("finer coarse").is_ok());
    // fractions are untouched by a grading swap
    assert_eq!(staged.mix(), state.mix());
}

#[test]
fn test_malformed_catalog_grading_is_rejected() {
    let catalog = fixture("persist_malformed");
    let state = recompute(
        &MixState::default(),
        MixChange::Aggregate { slot: AggregateSlot::Fine1, material: Some("Quartz sand".into()) },
        &catalog,
    )
    .unwrap();

    let result = recompute(
        &state,
        MixChange::Grading { slot: AggregateSlot::Fine1, name: Some("torn".into()) },
        &catalog,
    );
    assert!(matches!(result, Err(MixError::MalformedGrading { line: 2, .. })));
    assert!(state.geometry().is_none());
}
