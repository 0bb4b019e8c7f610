//! Cross-source combo comparison
//!
//! Two fixed pipeline comparisons are run per combo type:
//! - **defined vs built** (RFC vs runtime table): `MissingInRuntimeTable`,
//!   `ExtraInRuntimeTable`
//! - **built vs advertised** (runtime table vs UE capability):
//!   `MissingInAdvertisedCapability`
//!
//! Both also report `BcsMismatch` for common combos with disjoint BCS. A
//! combo type absent from one side compares as an empty set.

use super::normalizer::{bcs_matches, extract_unique_bands, UniqueBands};
use super::{ComboSet, ComboType, ComparisonResult, DataSource, Discrepancy, DiscrepancyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Combo sets of one source, keyed by combo type
pub type ComboCollection = BTreeMap<ComboType, ComboSet>;

/// Per-type comparison results plus the discrepancies they produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineComparison {
    pub results: BTreeMap<ComboType, ComparisonResult>,
    pub discrepancies: Vec<Discrepancy>,
}

/// Partition two combo sets of the same type
///
/// # Panics
/// Panics if the sets hold different combo types.
pub fn compare(set_a: &ComboSet, set_b: &ComboSet) -> ComparisonResult {
    assert_eq!(
        set_a.combo_type(),
        set_b.combo_type(),
        "cannot compare {} combos against {} combos",
        set_a.combo_type(),
        set_b.combo_type()
    );

    let keys_a = set_a.key_set();
    let keys_b = set_b.key_set();

    let common: std::collections::BTreeSet<String> = keys_a.intersection(&keys_b).cloned().collect();
    let only_in_a = keys_a.difference(&keys_b).cloned().collect();
    let only_in_b = keys_b.difference(&keys_a).cloned().collect();

    let bcs_mismatches = common
        .iter()
        .filter_map(|key| {
            let combo_a = set_a.get(key)?;
            let combo_b = set_b.get(key)?;
            if bcs_matches(combo_a.bcs(), combo_b.bcs()) {
                return None;
            }
            Some(
                Discrepancy::new(
                    DiscrepancyType::BcsMismatch,
                    combo_a.clone(),
                    set_a.source(),
                    set_b.source(),
                )
                .with_details(format!(
                    "BCS mismatch: {:?} vs {:?}",
                    combo_a.bcs().cloned().unwrap_or_default(),
                    combo_b.bcs().cloned().unwrap_or_default()
                )),
            )
        })
        .collect();

    ComparisonResult {
        source_a: set_a.source(),
        source_b: set_b.source(),
        combo_type: set_a.combo_type(),
        common,
        only_in_a,
        only_in_b,
        bcs_mismatches,
    }
}

fn set_or_empty(collection: &ComboCollection, combo_type: ComboType, source: DataSource) -> ComboSet {
    collection
        .get(&combo_type)
        .cloned()
        .unwrap_or_else(|| ComboSet::new(source, combo_type))
}

/// RFC definitions against the runtime table
pub fn compare_defined_vs_built(defined: &ComboCollection, built: &ComboCollection) -> PipelineComparison {
    let mut outcome = PipelineComparison::default();

    for combo_type in ComboType::ALL {
        let defined_set = set_or_empty(defined, combo_type, DataSource::Rfc);
        let built_set = set_or_empty(built, combo_type, DataSource::RuntimeTable);
        let result = compare(&defined_set, &built_set);

        for combo in result.only_in_a.iter().filter_map(|key| defined_set.get(key)) {
            outcome.discrepancies.push(
                Discrepancy::new(
                    DiscrepancyType::MissingInRuntimeTable,
                    combo.clone(),
                    DataSource::Rfc,
                    DataSource::RuntimeTable,
                )
                .with_details("Combo defined in RFC but not found in runtime table"),
            );
        }

        for combo in result.only_in_b.iter().filter_map(|key| built_set.get(key)) {
            outcome.discrepancies.push(
                Discrepancy::new(
                    DiscrepancyType::ExtraInRuntimeTable,
                    combo.clone(),
                    DataSource::Rfc,
                    DataSource::RuntimeTable,
                )
                .with_details("Combo in runtime table but not defined in RFC"),
            );
        }

        outcome.discrepancies.extend(result.bcs_mismatches.iter().cloned());

        debug!(
            "{} defined vs built: {} common, {} missing, {} extra, {} BCS mismatches",
            combo_type,
            result.common.len(),
            result.only_in_a.len(),
            result.only_in_b.len(),
            result.bcs_mismatches.len()
        );
        outcome.results.insert(combo_type, result);
    }

    outcome
}

/// Runtime table against the UE capability advertisement
pub fn compare_built_vs_advertised(
    built: &ComboCollection,
    advertised: &ComboCollection,
) -> PipelineComparison {
    let mut outcome = PipelineComparison::default();

    for combo_type in ComboType::ALL {
        let built_set = set_or_empty(built, combo_type, DataSource::RuntimeTable);
        let advertised_set = set_or_empty(advertised, combo_type, DataSource::UeCapability);
        let result = compare(&built_set, &advertised_set);

        for combo in result.only_in_a.iter().filter_map(|key| built_set.get(key)) {
            outcome.discrepancies.push(
                Discrepancy::new(
                    DiscrepancyType::MissingInAdvertisedCapability,
                    combo.clone(),
                    DataSource::RuntimeTable,
                    DataSource::UeCapability,
                )
                .with_details("Combo in runtime table but not advertised in UE capability"),
            );
        }

        outcome.discrepancies.extend(result.bcs_mismatches.iter().cloned());

        debug!(
            "{} built vs advertised: {} common, {} not advertised, {} BCS mismatches",
            combo_type,
            result.common.len(),
            result.only_in_a.len(),
            result.bcs_mismatches.len()
        );
        outcome.results.insert(combo_type, result);
    }

    outcome
}

// ============================================================================
// Summary statistics
// ============================================================================

/// Combo counts per source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub defined: usize,
    pub built: usize,
    pub advertised: usize,
}

/// Aggregate counts for one pipeline comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonStats {
    pub total_discrepancies: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub bcs_mismatches: usize,
    /// Mean match percentage over non-empty comparisons (100.0 if none)
    pub match_percentage: f64,
}

impl ComparisonStats {
    pub fn from_pipeline(comparison: &PipelineComparison) -> Self {
        let results = comparison.results.values();
        let percentages: Vec<f64> = results
            .clone()
            .filter(|r| !r.is_empty())
            .map(ComparisonResult::match_percentage)
            .collect();

        let match_percentage = if percentages.is_empty() {
            100.0
        } else {
            percentages.iter().sum::<f64>() / percentages.len() as f64
        };

        Self {
            total_discrepancies: comparison.discrepancies.len(),
            only_in_a: results.clone().map(|r| r.only_in_a.len()).sum(),
            only_in_b: results.clone().map(|r| r.only_in_b.len()).sum(),
            bcs_mismatches: results.map(|r| r.bcs_mismatches.len()).sum(),
            match_percentage,
        }
    }
}

/// Run-level combo statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboSummary {
    pub total_combos: SourceCounts,
    pub by_type: BTreeMap<ComboType, SourceCounts>,
    pub defined_vs_built: ComparisonStats,
    pub built_vs_advertised: ComparisonStats,
    pub unique_bands: UniqueBands,
}

pub fn summary_stats(
    defined: &ComboCollection,
    built: &ComboCollection,
    advertised: &ComboCollection,
    defined_vs_built: &PipelineComparison,
    built_vs_advertised: &PipelineComparison,
) -> ComboSummary {
    let count = |collection: &ComboCollection, combo_type: ComboType| {
        collection.get(&combo_type).map_or(0, ComboSet::len)
    };

    let mut total_combos = SourceCounts::default();
    let mut by_type = BTreeMap::new();
    for combo_type in ComboType::ALL {
        let counts = SourceCounts {
            defined: count(defined, combo_type),
            built: count(built, combo_type),
            advertised: count(advertised, combo_type),
        };
        total_combos.defined += counts.defined;
        total_combos.built += counts.built;
        total_combos.advertised += counts.advertised;
        by_type.insert(combo_type, counts);
    }

    let mut unique_bands = UniqueBands::default();
    for set in [defined, built, advertised].into_iter().flat_map(|c| c.values()) {
        unique_bands.merge(extract_unique_bands(set));
    }

    ComboSummary {
        total_combos,
        by_type,
        defined_vs_built: ComparisonStats::from_pipeline(defined_vs_built),
        built_vs_advertised: ComparisonStats::from_pipeline(built_vs_advertised),
        unique_bands,
    }
}
