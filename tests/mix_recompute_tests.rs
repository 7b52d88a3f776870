// Mix recompute tests
// Drives whole editing sessions through the public API and checks the snapshot stays coherent

use approx::assert_abs_diff_eq;
use more_asserts::{assert_ge, assert_le};
use vcctl_mix::assert_deviation;
use vcctl_mix::config::{DEFAULT_CATALOG_PATH, MixConfig};
use vcctl_mix::fractions::{BinderConstituent, MixConstituent};
use vcctl_mix::material_catalog::JsonMaterialCatalog;
use vcctl_mix::{AggregateSlot, MixChange, MixError, MixState, ScmSample, recompute};

fn default_catalog() -> JsonMaterialCatalog {
    JsonMaterialCatalog::load(DEFAULT_CATALOG_PATH.as_path()).unwrap()
}

fn apply_all(
    mut state: MixState,
    changes: Vec<MixChange>,
    catalog: &JsonMaterialCatalog,
) -> MixState {
    for change in changes {
        state = recompute(&state, change.clone(), catalog)
            .unwrap_or_else(|e| panic!("{change:?} rejected: {e}"));
    }
    state
}

fn full_session(catalog: &JsonMaterialCatalog) -> MixState {
    apply_all(
        MixState::default(),
        vec![
            MixChange::Cement("cement141".into()),
            MixChange::ScmSample { scm: ScmSample::Slag, sample: "Grade 100".into() },
            MixChange::BinderFraction { constituent: BinderConstituent::Slag, mass_fraction: 0.3 },
            MixChange::Aggregate {
                slot: AggregateSlot::Coarse1,
                material: Some("Limestone coarse".into()),
            },
            MixChange::AggregateFraction { slot: AggregateSlot::Coarse1, mass_fraction: 0.4 },
            MixChange::Grading {
                slot: AggregateSlot::Coarse1,
                name: Some("ASTM No. 57 coarse".into()),
            },
            MixChange::Aggregate {
                slot: AggregateSlot::Fine1,
                material: Some("Quartz sand".into()),
            },
            MixChange::AggregateFraction { slot: AggregateSlot::Fine1, mass_fraction: 0.3 },
            MixChange::Grading { slot: AggregateSlot::Fine1, name: Some("ASTM C33 fine".into()) },
            MixChange::WaterBinderRatio(0.4),
        ],
        catalog,
    )
}

#[test]
fn test_full_session_on_default_catalog() {
    println!("Building a slag blend with two aggregates from the default catalog");
    let catalog = default_catalog();
    let state = full_session(&catalog);

    let cement = state.cement().unwrap();
    assert!(cement.phases.has_alkali(), "six-row record carries alkali sulfates");
    assert_deviation!(cement.density.cement_sg, 3.2221, 0.05, "cement141 specific gravity");
    assert_le!(cement.density.cement_sg, cement.density.clinker_sg);
    println!("   cement SG {:.4}, binder SG {:.4}", cement.density.cement_sg, state.binder_sg());

    assert_abs_diff_eq!(state.binder().mass_of(BinderConstituent::Cement), 0.7, epsilon = 1e-9);
    assert_abs_diff_eq!(state.mix().mass_of(MixConstituent::Binder), 0.2143, epsilon = 1e-9);
    assert_abs_diff_eq!(state.mix().mass_of(MixConstituent::Water), 0.0857, epsilon = 1e-9);
    assert_eq!(state.water_binder_ratio(), 0.4);

    // coarse reaches up to 25000, fine bottoms out at 75
    let geometry = state.geometry().unwrap();
    assert_eq!(geometry.resolution, 25.0);
    assert_abs_diff_eq!(geometry.edge_length, 125000.0, epsilon = 1e-6);
    assert_eq!(geometry.voxels_per_edge(), 5000);
}

#[test]
fn test_snapshot_fractions_sum_to_one() {
    let catalog = default_catalog();
    let state = full_session(&catalog);

    for (what, sum) in [
        ("binder mass", state.binder().mass_sum()),
        ("binder volume", state.binder().volume_sum()),
        ("mix mass", state.mix().mass_sum()),
        ("mix volume", state.mix().volume_sum()),
    ] {
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-3);
        println!("   {what}: {sum:.4}");
    }

    let components = state.components();
    assert_eq!(components.len(), 5, "cement, slag, two aggregates and water");
    let mass: f64 = components.iter().map(|c| c.mass_fraction).sum();
    let volume: f64 = components.iter().map(|c| c.volume_fraction).sum();
    assert_abs_diff_eq!(mass, 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(volume, 1.0, epsilon = 1e-3);
}

#[test]
fn test_binder_sg_stays_between_constituents() {
    let catalog = default_catalog();
    let base = apply_all(
        MixState::default(),
        vec![
            MixChange::Cement("cement140".into()),
            MixChange::ScmSample { scm: ScmSample::FlyAsh, sample: "Class F".into() },
        ],
        &catalog,
    );
    let cement_sg = base.cement().unwrap().density.cement_sg;

    let mut previous = cement_sg;
    for step in 0..=9 {
        let fly_ash = step as f64 * 0.1;
        let state = recompute(
            &base,
            MixChange::BinderFraction {
                constituent: BinderConstituent::FlyAsh,
                mass_fraction: fly_ash,
            },
            &catalog,
        )
        .unwrap();

        let sg = state.binder_sg();
        assert_ge!(sg, 2.2 - 1e-4);
        assert_le!(sg, cement_sg + 1e-4);
        // more of the lighter SCM never makes the binder denser
        assert_le!(sg, previous + 1e-4);
        previous = sg;
    }
}

#[test]
fn test_water_binder_ratio_sweep() {
    let catalog = default_catalog();
    let base = apply_all(
        MixState::default(),
        vec![
            MixChange::Cement("opc".into()),
            MixChange::Aggregate {
                slot: AggregateSlot::Fine2,
                material: Some("Manufactured sand".into()),
            },
            MixChange::AggregateFraction { slot: AggregateSlot::Fine2, mass_fraction: 0.55 },
        ],
        &catalog,
    );

    for ratio in [0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.6, 0.75] {
        let state = recompute(&base, MixChange::WaterBinderRatio(ratio), &catalog).unwrap();
        assert_eq!(state.water_binder_ratio(), ratio);
        assert_eq!(state.target_water_binder_ratio(), ratio);
        assert_abs_diff_eq!(state.mix().mass_of(MixConstituent::Fine2), 0.55, epsilon = 1e-9);
        assert_abs_diff_eq!(state.mix().mass_sum(), 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_rejected_edits_leave_state_alone() {
    let catalog = default_catalog();
    let state = full_session(&catalog);
    let before = state.clone();

    let too_much_aggregate = recompute(
        &state,
        MixChange::AggregateFraction { slot: AggregateSlot::Fine1, mass_fraction: 0.6 },
        &catalog,
    );
    assert!(matches!(too_much_aggregate, Err(MixError::FractionOutOfRange { .. })));

    let too_much_scm = recompute(
        &state,
        MixChange::BinderFraction {
            constituent: BinderConstituent::SilicaFume,
            mass_fraction: 0.7,
        },
        &catalog,
    );
    assert!(matches!(too_much_scm, Err(MixError::FractionOutOfRange { .. })));

    let unknown = recompute(
        &state,
        MixChange::Grading { slot: AggregateSlot::Fine1, name: Some("no such grading".into()) },
        &catalog,
    );
    assert!(matches!(unknown, Err(MixError::MissingMaterial { kind: "grading", .. })));
    assert!(!unknown.unwrap_err().is_validation());

    assert_eq!(state, before);
}

#[test]
fn test_disabling_slots_resizes_domain() {
    let catalog = default_catalog();
    let state = full_session(&catalog);

    let fine_only = recompute(
        &state,
        MixChange::Aggregate { slot: AggregateSlot::Coarse1, material: None },
        &catalog,
    )
    .unwrap();
    assert!(fine_only.aggregate(AggregateSlot::Coarse1).is_none());
    // fine grading alone: 9500 top, 75 bottom
    let geometry = fine_only.geometry().unwrap();
    assert_eq!(geometry.resolution, 25.0);
    assert_abs_diff_eq!(geometry.edge_length, 47500.0, epsilon = 1e-6);
    assert_abs_diff_eq!(fine_only.mix().mass_of(MixConstituent::Coarse1), 0.0);

    let none = recompute(
        &fine_only,
        MixChange::Aggregate { slot: AggregateSlot::Fine1, material: None },
        &catalog,
    )
    .unwrap();
    assert!(none.geometry().is_none());
    assert_eq!(none.water_binder_ratio(), 0.4);
}

#[test]
fn test_config_overrides_phase_specific_gravities() {
    let catalog = default_catalog();
    let heavy = MixConfig::from_json_str(r#"{"specific_gravities": {"c3s": 3.5}}"#).unwrap();

    let opc = MixChange::Cement("opc".into());
    let default_state = recompute(&MixState::default(), opc.clone(), &catalog).unwrap();
    let heavy_state = recompute(&MixState::new(heavy), opc, &catalog).unwrap();

    assert_eq!(default_state.cement().unwrap().density.cement_sg, 3.1898);
    assert_ge!(
        heavy_state.cement().unwrap().density.clinker_sg,
        default_state.cement().unwrap().density.clinker_sg
    );
}

#[test]
fn test_snapshot_serializes() {
    let catalog = default_catalog();
    let state = full_session(&catalog);
    let json = serde_json::to_value(&state).unwrap();

    assert_eq!(json["cement"]["name"], "cement141");
    assert_eq!(json["geometry"]["resolution"], 25.0);
    assert_eq!(json["mix"]["mass"].as_array().unwrap().len(), MixConstituent::COUNT);
}
