//! Band tracer
//!
//! One tracer per analysis run. Documents are ingested with the `set_*`
//! methods (each call replaces the previous document for that stage), then
//! [`BandTracer::trace_all`] walks every interesting band through the stage
//! pipeline.

use super::summary::summarize;
use super::{
    classify, Band, BandSets, BandStatus, BandTraceResult, DocumentStatus, NvPreferences, NvRange,
    Rat, Stage, StageShape, TraceSummary,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// WCDMA bands that the HW filter's GW mask can express
const WCDMA_BAND_RANGE: std::ops::RangeInclusive<u32> = 1..=26;

/// Per-band stage tracer
#[derive(Debug, Clone)]
pub struct BandTracer {
    rfc: Option<BandSets>,
    hw_filter: Option<BandSets>,
    carrier: Option<BandSets>,
    generic: Option<BandSets>,
    nv: Option<NvPreferences>,
    observed: Option<BandSets>,
    advertised: Option<BandSets>,
    documents: BTreeMap<Stage, DocumentStatus>,
}

impl Default for BandTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl BandTracer {
    pub fn new() -> Self {
        let documents = Stage::ALL
            .iter()
            .map(|stage| (*stage, DocumentStatus::not_loaded(*stage)))
            .collect();

        Self {
            rfc: None,
            hw_filter: None,
            carrier: None,
            generic: None,
            nv: None,
            observed: None,
            advertised: None,
            documents,
        }
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// RF card supported bands (allow-list)
    pub fn set_rfc_bands(&mut self, bands: BandSets) {
        self.mark_loaded(Stage::Rfc, Some(bands.total()), bands.describe());
        self.rfc = Some(bands);
    }

    /// Hardware band filter (allow-list)
    pub fn set_hw_filter_bands(&mut self, bands: BandSets) {
        self.mark_loaded(Stage::HwFilter, Some(bands.total()), bands.describe());
        self.hw_filter = Some(bands);
    }

    /// Carrier policy exclusions (deny-list)
    pub fn set_carrier_exclusions(&mut self, bands: BandSets) {
        let details = format!("Excl: {}", bands.describe());
        self.mark_loaded(Stage::Carrier, Some(bands.total()), details);
        self.carrier = Some(bands);
    }

    /// Generic regulatory exclusions (deny-list)
    pub fn set_generic_exclusions(&mut self, bands: BandSets) {
        let details = format!("Excl: {}", bands.describe());
        self.mark_loaded(Stage::Generic, Some(bands.total()), details);
        self.generic = Some(bands);
    }

    /// NV band preferences (allow-list with per-range applicability)
    pub fn set_nv_preferences(&mut self, prefs: NvPreferences) {
        let details = if prefs.present_ranges.is_empty() {
            "No band pref NVs found".to_string()
        } else {
            format!("Enabled: {}", prefs.bands.describe())
        };
        self.mark_loaded(Stage::NvPreference, Some(prefs.bands.total()), details);
        self.nv = Some(prefs);
    }

    /// Bands seen in the QXDM log
    pub fn set_observed_bands(&mut self, bands: BandSets) {
        self.mark_loaded(Stage::Qxdm, Some(bands.total()), bands.describe());
        self.observed = Some(bands);
    }

    /// Bands advertised in the UE capability information
    pub fn set_advertised_bands(&mut self, bands: BandSets) {
        self.mark_loaded(Stage::UeCapability, Some(bands.total()), bands.describe());
        self.advertised = Some(bands);
    }

    fn mark_loaded(&mut self, stage: Stage, band_count: Option<usize>, details: String) {
        debug!("{} loaded: {}", stage.document_title(), details);
        self.documents.insert(
            stage,
            DocumentStatus {
                name: stage.document_title().to_string(),
                loaded: true,
                band_count,
                details,
            },
        );
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load status of every stage document, in stage order
    pub fn document_status(&self) -> &BTreeMap<Stage, DocumentStatus> {
        &self.documents
    }

    fn document(&self, stage: Stage) -> Option<&BandSets> {
        match stage {
            Stage::Rfc => self.rfc.as_ref(),
            Stage::HwFilter => self.hw_filter.as_ref(),
            Stage::Carrier => self.carrier.as_ref(),
            Stage::Generic => self.generic.as_ref(),
            Stage::NvPreference => self.nv.as_ref().map(|nv| &nv.bands),
            Stage::Qxdm => self.observed.as_ref(),
            Stage::UeCapability => self.advertised.as_ref(),
        }
    }

    /// Bands worth tracing for one RAT
    ///
    /// Union of the RFC, carrier, generic, QXDM and UE capability sets over
    /// the RAT's family. WCDMA also takes the HW filter's bands 1-26.
    pub fn bands_of_interest(&self, rat: Rat) -> BTreeSet<u32> {
        let sources = [
            self.rfc.as_ref(),
            self.carrier.as_ref(),
            self.generic.as_ref(),
            self.observed.as_ref(),
            self.advertised.as_ref(),
        ];

        let mut bands: BTreeSet<u32> = sources
            .into_iter()
            .flatten()
            .flat_map(|sets| rat.family().iter().filter_map(|r| sets.get(*r)))
            .flatten()
            .copied()
            .collect();

        if rat == Rat::Wcdma {
            if let Some(hw) = self.hw_filter.as_ref().and_then(|s| s.get(Rat::Wcdma)) {
                bands.extend(hw.iter().filter(|b| WCDMA_BAND_RANGE.contains(b)));
            }
        }

        bands
    }

    // ========================================================================
    // Tracing
    // ========================================================================

    /// Status of one band at one stage, ignoring earlier stages
    fn evaluate(&self, stage: Stage, band: &Band) -> BandStatus {
        let Some(sets) = self.document(stage) else {
            return BandStatus::NotApplicable;
        };

        if stage == Stage::NvPreference {
            let present = NvRange::covering(band)
                .zip(self.nv.as_ref())
                .is_some_and(|(range, nv)| nv.is_present(range));
            if !present {
                return BandStatus::NotApplicable;
            }
        }

        // A loaded document that lists nothing for this RAT lists an empty set
        let listed = sets.get(band.rat);

        if stage == Stage::UeCapability
            && band.rat.is_nr()
            && listed.map_or(true, BTreeSet::is_empty)
        {
            return BandStatus::NotApplicable;
        }

        let contains = listed.is_some_and(|bands| bands.contains(&band.number));
        match stage.shape() {
            StageShape::AllowList | StageShape::Observation => {
                if contains {
                    BandStatus::Pass
                } else {
                    BandStatus::Fail
                }
            }
            StageShape::DenyList => {
                if contains {
                    BandStatus::Fail
                } else {
                    BandStatus::Pass
                }
            }
        }
    }

    /// Trace one band through every stage
    pub fn trace_band(&self, band: Band) -> BandTraceResult {
        let mut stages = BTreeMap::new();
        let mut filtered_at = None;

        for stage in Stage::FILTERING {
            let status = if filtered_at.is_some() {
                BandStatus::Skipped
            } else {
                self.evaluate(stage, &band)
            };
            if status == BandStatus::Fail {
                filtered_at = Some(stage);
            }
            stages.insert(stage, status);
        }

        for stage in Stage::OBSERVATION {
            stages.insert(stage, self.evaluate(stage, &band));
        }

        let (final_status, anomaly_reason) = classify(&stages, filtered_at.is_some());
        BandTraceResult::new(band, stages, final_status, filtered_at, anomaly_reason)
    }

    /// Trace every interesting band of every RAT
    ///
    /// Every RAT key is present in the result; lists are ascending by band
    /// number.
    pub fn trace_all(&self) -> BTreeMap<Rat, Vec<BandTraceResult>> {
        let results: BTreeMap<Rat, Vec<BandTraceResult>> = Rat::ALL
            .iter()
            .map(|rat| {
                let traced: Vec<BandTraceResult> = self
                    .bands_of_interest(*rat)
                    .into_iter()
                    .map(|number| self.trace_band(Band::new(number, *rat)))
                    .collect();
                debug!("Traced {} {} bands", traced.len(), rat);
                (*rat, traced)
            })
            .collect();

        let loaded = self.documents.values().filter(|d| d.loaded).count();
        info!(
            "Band trace complete: {} bands across {} RATs ({} of {} documents loaded)",
            results.values().map(Vec::len).sum::<usize>(),
            results.len(),
            loaded,
            self.documents.len()
        );

        results
    }

    /// Per-RAT counts for a fresh trace
    pub fn summary(&self) -> BTreeMap<Rat, TraceSummary> {
        summarize(&self.trace_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::FinalStatus;

    fn lte(bands: &[u32]) -> BandSets {
        BandSets::new().with(Rat::Lte, bands.iter().copied())
    }

    fn find(results: &BTreeMap<Rat, Vec<BandTraceResult>>, rat: Rat, number: u32) -> BandTraceResult {
        results[&rat]
            .iter()
            .find(|r| r.band().number == number)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_new_tracer_has_nothing_loaded() {
        let tracer = BandTracer::new();
        assert_eq!(tracer.document_status().len(), Stage::ALL.len());
        assert!(tracer.document_status().values().all(|d| !d.loaded));
    }

    #[test]
    fn test_trace_all_has_every_rat() {
        let results = BandTracer::new().trace_all();
        for rat in Rat::ALL {
            assert!(results[&rat].is_empty());
        }
    }

    #[test]
    fn test_simple_filter_chain() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[1, 3, 7]));
        tracer.set_hw_filter_bands(lte(&[1, 3]));

        let results = tracer.trace_all();
        let band7 = find(&results, Rat::Lte, 7);

        assert_eq!(band7.stage(Stage::Rfc), BandStatus::Pass);
        assert_eq!(band7.stage(Stage::HwFilter), BandStatus::Fail);
        assert_eq!(band7.stage(Stage::Carrier), BandStatus::Skipped);
        assert_eq!(band7.stage(Stage::Generic), BandStatus::Skipped);
        assert_eq!(band7.stage(Stage::NvPreference), BandStatus::Skipped);
        assert_eq!(band7.stage(Stage::Qxdm), BandStatus::NotApplicable);
        assert_eq!(band7.final_status(), FinalStatus::Filtered);
        assert_eq!(band7.filtered_at(), Some(Stage::HwFilter));

        let band1 = find(&results, Rat::Lte, 1);
        assert_eq!(band1.final_status(), FinalStatus::Enabled);
        assert!(!band1.is_filtered());
    }

    #[test]
    fn test_anomaly_detection() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[1, 3]));
        tracer.set_observed_bands(lte(&[1, 3, 7]));

        let band7 = find(&tracer.trace_all(), Rat::Lte, 7);
        assert_eq!(band7.stage(Stage::Rfc), BandStatus::Fail);
        assert_eq!(band7.stage(Stage::Qxdm), BandStatus::Pass);
        assert_eq!(band7.final_status(), FinalStatus::Anomaly);
        assert!(band7.anomaly_reason().is_some());
    }

    #[test]
    fn test_deny_list_stages() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[2, 4, 13]));
        tracer.set_carrier_exclusions(lte(&[13]));
        tracer.set_generic_exclusions(lte(&[4]));

        let results = tracer.trace_all();
        let band13 = find(&results, Rat::Lte, 13);
        assert_eq!(band13.filtered_at(), Some(Stage::Carrier));
        assert_eq!(band13.stage(Stage::Generic), BandStatus::Skipped);

        let band4 = find(&results, Rat::Lte, 4);
        assert_eq!(band4.stage(Stage::Carrier), BandStatus::Pass);
        assert_eq!(band4.filtered_at(), Some(Stage::Generic));

        assert_eq!(find(&results, Rat::Lte, 2).final_status(), FinalStatus::Enabled);
    }

    #[test]
    fn test_nv_missing_sub_range_is_not_applicable() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[3, 66]));
        // Only the base item is present; it enables band 3
        tracer.set_nv_preferences(NvPreferences::new(lte(&[3])).with_range(NvRange::LteBase));

        let results = tracer.trace_all();
        assert_eq!(find(&results, Rat::Lte, 3).stage(Stage::NvPreference), BandStatus::Pass);

        let band66 = find(&results, Rat::Lte, 66);
        assert_eq!(band66.stage(Stage::NvPreference), BandStatus::NotApplicable);
        assert_eq!(band66.final_status(), FinalStatus::Enabled);
    }

    #[test]
    fn test_nv_present_range_filters() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[3, 66]));
        tracer.set_nv_preferences(
            NvPreferences::new(lte(&[3]))
                .with_range(NvRange::LteBase)
                .with_range(NvRange::LteExtended),
        );

        let band66 = find(&tracer.trace_all(), Rat::Lte, 66);
        assert_eq!(band66.filtered_at(), Some(Stage::NvPreference));
        assert_eq!(band66.final_status(), FinalStatus::Filtered);
    }

    #[test]
    fn test_uncovered_rat_fails_allow_list() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(BandSets::new().with_nr([78]));
        tracer.set_hw_filter_bands(lte(&[1]));

        let band = find(&tracer.trace_all(), Rat::NrSa, 78);
        assert_eq!(band.stage(Stage::HwFilter), BandStatus::Fail);
        assert_eq!(band.filtered_at(), Some(Stage::HwFilter));
        assert_eq!(band.final_status(), FinalStatus::Filtered);
    }

    #[test]
    fn test_uncovered_rat_passes_deny_list() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(BandSets::new().with_nr([78]));
        tracer.set_carrier_exclusions(lte(&[14]));

        let band = find(&tracer.trace_all(), Rat::NrSa, 78);
        assert_eq!(band.stage(Stage::Carrier), BandStatus::Pass);
        assert_eq!(band.final_status(), FinalStatus::Enabled);
    }

    #[test]
    fn test_nv_present_range_without_rat_entry_fails() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(BandSets::new().with_nr([78]));
        tracer.set_nv_preferences(NvPreferences::new(lte(&[3])).with_range(NvRange::NrSa));

        let results = tracer.trace_all();
        assert_eq!(find(&results, Rat::NrSa, 78).stage(Stage::NvPreference), BandStatus::Fail);
        assert_eq!(
            find(&results, Rat::NrNsa, 78).stage(Stage::NvPreference),
            BandStatus::NotApplicable
        );
    }

    #[test]
    fn test_empty_nr_capability_is_not_applicable() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(BandSets::new().with_nr([78]));
        tracer.set_observed_bands(BandSets::new().with_nr([78]));
        tracer.set_advertised_bands(
            BandSets::new()
                .with(Rat::NrSa, [78])
                .with(Rat::NrNsa, std::iter::empty()),
        );

        let results = tracer.trace_all();
        assert_eq!(find(&results, Rat::NrSa, 78).stage(Stage::UeCapability), BandStatus::Pass);
        assert_eq!(
            find(&results, Rat::NrNsa, 78).stage(Stage::UeCapability),
            BandStatus::NotApplicable
        );
    }

    #[test]
    fn test_missing_in_device_log() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[1, 3]));
        tracer.set_observed_bands(lte(&[1]));
        tracer.set_advertised_bands(lte(&[1, 3]));

        let band3 = find(&tracer.trace_all(), Rat::Lte, 3);
        assert_eq!(band3.final_status(), FinalStatus::MissingInDeviceLog);
    }

    #[test]
    fn test_nr_modes_share_interesting_bands() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(BandSets::new().with(Rat::NrSa, [77]).with(Rat::NrNsa, [78]));

        assert_eq!(tracer.bands_of_interest(Rat::NrSa), BTreeSet::from([77, 78]));
        assert_eq!(tracer.bands_of_interest(Rat::NrNsa), BTreeSet::from([77, 78]));
    }

    #[test]
    fn test_wcdma_draws_from_hw_filter() {
        let mut tracer = BandTracer::new();
        tracer.set_hw_filter_bands(BandSets::new().with(Rat::Wcdma, [1, 2, 5, 32]));

        assert_eq!(tracer.bands_of_interest(Rat::Wcdma), BTreeSet::from([1, 2, 5]));
        // HW filter is not a source of interesting LTE bands
        tracer.set_hw_filter_bands(lte(&[1, 2, 3]));
        assert!(tracer.bands_of_interest(Rat::Lte).is_empty());
    }

    #[test]
    fn test_set_overwrites_previous_document() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[1, 3]));
        tracer.set_rfc_bands(lte(&[7]));

        assert_eq!(tracer.bands_of_interest(Rat::Lte), BTreeSet::from([7]));
        let status = &tracer.document_status()[&Stage::Rfc];
        assert!(status.loaded);
        assert_eq!(status.band_count, Some(1));
    }

    #[test]
    fn test_summary_counts() {
        let mut tracer = BandTracer::new();
        tracer.set_rfc_bands(lte(&[1, 3, 7]));
        tracer.set_hw_filter_bands(lte(&[1, 3]));

        let summary = tracer.summary()[&Rat::Lte];
        assert_eq!(summary.total, 3);
        assert_eq!(summary.enabled, 2);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.anomalies, 0);
    }
}
