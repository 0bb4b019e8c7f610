//! End-to-end scenarios across the band tracer, comparator and reasoning engine
//!
//! Tests cover:
//! - Stage monotonicity and NotApplicable purity over a realistic band set
//! - Loaded documents that list nothing for a RAT
//! - Simple filter chain and anomaly detection
//! - Combo missing in runtime table, BCS leniency
//! - Knowledge-base explanation and EFS pruning through a full run

use bandcheck::bands::{BandSets, BandStatus, BandTracer, FinalStatus, NvPreferences, NvRange, Rat, Stage};
use bandcheck::combos::{
    compare, compare_defined_vs_built, Combo, ComboCollection, ComboSet, ComboType, DataSource,
    DiscrepancyType, EfsControlState, PrunedCombo,
};
use bandcheck::input::{BandInput, ComboInput, ComboSpec};
use bandcheck::knowledge::{
    BandRestriction, KnowledgeBaseContext, ReasoningEngine, RestrictionType, Severity,
};
use bandcheck::{AnalysisInput, AnalysisRun, ModuleRegistry};
use std::collections::BTreeMap;

fn loaded_tracer() -> BandTracer {
    let mut tracer = BandTracer::new();
    tracer.set_rfc_bands(
        BandSets::new()
            .with(Rat::Lte, [1, 2, 3, 4, 5, 7, 12, 13, 14, 66, 71])
            .with_nr([2, 5, 66, 71, 77, 78, 260]),
    );
    tracer.set_hw_filter_bands(
        BandSets::new()
            .with(Rat::Lte, [1, 2, 3, 4, 5, 12, 13, 14, 66, 71])
            .with_nr([2, 5, 66, 71, 77, 78]),
    );
    tracer.set_carrier_exclusions(BandSets::new().with(Rat::Lte, [14]));
    tracer.set_generic_exclusions(BandSets::new().with(Rat::Lte, [13]).with_nr([260]));
    tracer.set_nv_preferences(
        NvPreferences::new(BandSets::new().with(Rat::Lte, [1, 2, 3, 4, 5, 12]))
            .with_range(NvRange::LteBase),
    );
    tracer.set_observed_bands(BandSets::new().with(Rat::Lte, [1, 2, 3, 66, 41]).with_nr([77, 78]));
    tracer.set_advertised_bands(BandSets::new().with(Rat::Lte, [1, 2, 3, 5, 66]).with_nr([77]));
    tracer
}

#[test]
fn test_stage_monotonicity() {
    let results = loaded_tracer().trace_all();

    for trace in results.values().flatten() {
        let first_fail = Stage::FILTERING
            .iter()
            .position(|s| trace.stage(*s) == BandStatus::Fail);

        match first_fail {
            Some(index) => {
                assert_eq!(trace.filtered_at(), Some(Stage::FILTERING[index]), "{}", trace.band());
                for later in &Stage::FILTERING[index + 1..] {
                    assert_eq!(trace.stage(*later), BandStatus::Skipped, "{}", trace.band());
                }
            }
            None => {
                assert_eq!(trace.filtered_at(), None, "{}", trace.band());
                assert!(Stage::FILTERING
                    .iter()
                    .all(|s| trace.stage(*s) != BandStatus::Skipped));
            }
        }
    }
}

#[test]
fn test_not_applicable_purity() {
    let mut tracer = BandTracer::new();
    tracer.set_rfc_bands(BandSets::new().with(Rat::Lte, [1, 3, 7]).with_nr([78]));
    tracer.set_observed_bands(BandSets::new().with(Rat::Lte, [3, 40]));

    let never_loaded = [
        Stage::HwFilter,
        Stage::Carrier,
        Stage::Generic,
        Stage::NvPreference,
        Stage::UeCapability,
    ];
    for trace in tracer.trace_all().values().flatten() {
        for stage in never_loaded {
            let status = trace.stage(stage);
            assert!(
                status == BandStatus::NotApplicable || status == BandStatus::Skipped,
                "{} at {} was {:?}",
                trace.band(),
                stage,
                status
            );
        }
    }
}

#[test]
fn test_realistic_dispositions() {
    let results = loaded_tracer().trace_all();
    let lte = |n: u32| {
        results[&Rat::Lte]
            .iter()
            .find(|t| t.band().number == n)
            .unwrap()
            .clone()
    };

    // Not in HW filter
    assert_eq!(lte(7).filtered_at(), Some(Stage::HwFilter));
    // Carrier and generic exclusions
    assert_eq!(lte(14).filtered_at(), Some(Stage::Carrier));
    assert_eq!(lte(13).filtered_at(), Some(Stage::Generic));
    // NV base range present and band 4 enabled, but not seen in QXDM while UE cap is loaded
    assert_eq!(lte(4).final_status(), FinalStatus::MissingInDeviceLog);
    // Band 66 sits in the absent extended NV range
    assert_eq!(lte(66).stage(Stage::NvPreference), BandStatus::NotApplicable);
    assert_eq!(lte(66).final_status(), FinalStatus::Enabled);
    // Band 41 observed without RFC support
    assert_eq!(lte(41).final_status(), FinalStatus::Anomaly);

    let nr_sa_78 = results[&Rat::NrSa]
        .iter()
        .find(|t| t.band().number == 78)
        .unwrap();
    assert_eq!(nr_sa_78.final_status(), FinalStatus::MissingInNetworkCapability);

    let lists_sorted = results
        .values()
        .all(|list| list.windows(2).all(|w| w[0].band().number < w[1].band().number));
    assert!(lists_sorted);
}

fn trace_of(
    results: &BTreeMap<Rat, Vec<bandcheck::bands::BandTraceResult>>,
    rat: Rat,
    number: u32,
) -> bandcheck::bands::BandTraceResult {
    results[&rat]
        .iter()
        .find(|t| t.band().number == number)
        .cloned()
        .unwrap()
}

#[test]
fn test_observation_of_other_rat_reveals_anomaly() {
    let mut tracer = BandTracer::new();
    tracer.set_rfc_bands(BandSets::new().with(Rat::Lte, [1, 3]));
    tracer.set_observed_bands(BandSets::new().with(Rat::NrSa, [78]));

    let results = tracer.trace_all();

    let n78 = trace_of(&results, Rat::NrSa, 78);
    assert_eq!(n78.stage(Stage::Rfc), BandStatus::Fail);
    assert_eq!(n78.stage(Stage::Qxdm), BandStatus::Pass);
    assert_eq!(n78.final_status(), FinalStatus::Anomaly);

    let b3 = trace_of(&results, Rat::Lte, 3);
    assert_eq!(b3.stage(Stage::Rfc), BandStatus::Pass);
    assert_eq!(b3.stage(Stage::Qxdm), BandStatus::Fail);
}

#[test]
fn test_nr_only_capability_reveals_missing_lte_band() {
    let mut tracer = BandTracer::new();
    tracer.set_rfc_bands(BandSets::new().with(Rat::Lte, [1, 3]));
    tracer.set_observed_bands(BandSets::new().with(Rat::Lte, [1]));
    tracer.set_advertised_bands(BandSets::new().with(Rat::NrSa, [78]));

    let results = tracer.trace_all();

    let b3 = trace_of(&results, Rat::Lte, 3);
    assert_eq!(b3.stage(Stage::UeCapability), BandStatus::Fail);
    assert_eq!(b3.final_status(), FinalStatus::MissingInDeviceLog);

    let b1 = trace_of(&results, Rat::Lte, 1);
    assert_eq!(b1.stage(Stage::UeCapability), BandStatus::Fail);
    assert_eq!(b1.final_status(), FinalStatus::MissingInNetworkCapability);
}

#[test]
fn test_nr_sub_mode_without_capability_stays_not_applicable() {
    let mut tracer = BandTracer::new();
    tracer.set_rfc_bands(BandSets::new().with_nr([78]));
    tracer.set_observed_bands(BandSets::new().with_nr([78]));
    tracer.set_advertised_bands(BandSets::new().with(Rat::NrSa, [78]));

    let results = tracer.trace_all();

    let sa = trace_of(&results, Rat::NrSa, 78);
    assert_eq!(sa.stage(Stage::UeCapability), BandStatus::Pass);
    assert_eq!(sa.final_status(), FinalStatus::Enabled);

    let nsa = trace_of(&results, Rat::NrNsa, 78);
    assert_eq!(nsa.stage(Stage::UeCapability), BandStatus::NotApplicable);
    assert_eq!(nsa.final_status(), FinalStatus::Enabled);
}

#[test]
fn test_combo_missing_in_runtime_table() {
    let mut defined = ComboSet::new(DataSource::Rfc, ComboType::LteCa);
    defined.extend(["1A-3A", "1A-7A"].map(|k| Combo::parse(ComboType::LteCa, k).unwrap()));
    let mut built = ComboSet::new(DataSource::RuntimeTable, ComboType::LteCa);
    built.insert(Combo::parse(ComboType::LteCa, "1A-3A").unwrap());

    let result = compare(&defined, &built);
    assert_eq!(result.only_in_a.iter().collect::<Vec<_>>(), vec!["1A-7A"]);
    assert_eq!(result.match_percentage(), 50.0);

    let outcome = compare_defined_vs_built(
        &ComboCollection::from([(ComboType::LteCa, defined)]),
        &ComboCollection::from([(ComboType::LteCa, built)]),
    );
    let missing: Vec<_> = outcome
        .discrepancies
        .iter()
        .filter(|d| d.discrepancy_type() == DiscrepancyType::MissingInRuntimeTable)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].combo().to_string(), "1A-7A");
}

#[test]
fn test_bcs_leniency() {
    let mut a = ComboSet::new(DataSource::Rfc, ComboType::Endc);
    a.insert("66A-n77A".parse().unwrap());
    let mut b = ComboSet::new(DataSource::RuntimeTable, ComboType::Endc);
    b.insert(Combo::parse(ComboType::Endc, "66A-n77A").unwrap().with_bcs([2]));

    assert!(compare(&a, &b).bcs_mismatches.is_empty());
}

#[test]
fn test_knowledge_base_explanation() {
    let kb = KnowledgeBaseContext::new().with_band_restriction(BandRestriction::new(
        71,
        RestrictionType::Regional,
        "not certified",
    ));
    let mut defined = ComboSet::new(DataSource::Rfc, ComboType::Endc);
    defined.insert("66A-n71A".parse().unwrap());

    let mut outcome = compare_defined_vs_built(
        &ComboCollection::from([(ComboType::Endc, defined)]),
        &ComboCollection::new(),
    );
    ReasoningEngine::new(kb).enrich(&mut outcome.discrepancies);

    let d = &outcome.discrepancies[0];
    assert_eq!(d.discrepancy_type(), DiscrepancyType::MissingInRuntimeTable);
    let reason = d.reason().unwrap();
    assert_eq!(reason.severity, Severity::Expected);
    assert!(reason.explanation.as_deref().unwrap().contains("71"));
    assert_eq!(d.severity(), Severity::Expected);
}

#[test]
fn test_full_run_with_efs_and_carrier() {
    let input = AnalysisInput {
        bands: Some(BandInput {
            rfc: Some(BandSets::new().with(Rat::Lte, [1, 3, 7])),
            ..BandInput::default()
        }),
        combos: Some(ComboInput {
            defined: BTreeMap::from([(
                ComboType::LteCa,
                vec![
                    ComboSpec::new("1A-3A"),
                    ComboSpec::new("1A-7A"),
                    ComboSpec::new("3A-7A"),
                ],
            )]),
            built: BTreeMap::from([(ComboType::LteCa, vec![ComboSpec::new("1A-3A")])]),
            advertised: BTreeMap::from([(ComboType::LteCa, vec![ComboSpec::new("1A-3A")])]),
        }),
        efs: Some(EfsControlState {
            pruned_combos: vec![PrunedCombo::new("1A-7A", None)],
            ..EfsControlState::default()
        }),
    };
    let kb = KnowledgeBaseContext::new()
        .with_carrier_requirement(bandcheck::knowledge::CarrierRequirement::new("Verizon").require("7A+3A"))
        .with_active_carrier("Verizon");

    let report = AnalysisRun::new(input, kb)
        .unwrap()
        .execute(&ModuleRegistry::standard())
        .unwrap();

    let combos = report.combos.unwrap();
    let by_key: BTreeMap<String, Severity> = combos
        .discrepancies
        .iter()
        .map(|d| (d.combo().canonical_key(), d.severity()))
        .collect();
    assert_eq!(by_key["1A-7A"], Severity::Expected);
    assert_eq!(by_key["3A-7A"], Severity::Critical);

    assert_eq!(combos.action_items.len(), 1);
    assert_eq!(combos.action_items[0].combo, "3A-7A");
    assert_eq!(report.active_carrier.as_deref(), Some("Verizon"));
    assert!(report.bands.is_some());
}
