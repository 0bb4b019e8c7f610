//! Band tracing
//!
//! Threads every radio band through the ordered pipeline of configuration
//! documents (RFC → HW filter → carrier policy → generic restrictions → NV
//! preferences) and the two observation sources (QXDM log, UE capability),
//! recording a per-stage status and a final disposition for each band.
//!
//! # Stage shapes
//! - **Allow-lists**: RFC, HW_Filter, NV_Preference (band must be listed)
//! - **Deny-lists**: Carrier, Generic (band must NOT be listed)
//! - **Observations**: QXDM, UE_Capability (presence is reported, never filters)

pub mod summary;
pub mod tracer;

pub use summary::TraceSummary;
pub use tracer::BandTracer;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Band identity
// ============================================================================

/// Radio access technology of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rat {
    Gsm,
    Wcdma,
    Lte,
    NrSa,
    NrNsa,
}

impl Rat {
    /// All RAT types in report order
    pub const ALL: [Rat; 5] = [Rat::Gsm, Rat::Wcdma, Rat::Lte, Rat::NrSa, Rat::NrNsa];

    pub fn is_nr(&self) -> bool {
        matches!(self, Rat::NrSa | Rat::NrNsa)
    }

    /// RAT types whose band numbering is shared with this one
    ///
    /// NR SA and NR NSA draw from the same band catalogue, so a band seen in
    /// either sub-mode is of interest to both.
    pub fn family(&self) -> &'static [Rat] {
        match self {
            Rat::NrSa | Rat::NrNsa => &[Rat::NrSa, Rat::NrNsa],
            Rat::Gsm => &[Rat::Gsm],
            Rat::Wcdma => &[Rat::Wcdma],
            Rat::Lte => &[Rat::Lte],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rat::Gsm => "GSM",
            Rat::Wcdma => "WCDMA",
            Rat::Lte => "LTE",
            Rat::NrSa => "NR_SA",
            Rat::NrNsa => "NR_NSA",
        }
    }
}

impl fmt::Display for Rat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a radio band: band number plus RAT type
///
/// GSM bands are numbered by their frequency (850, 900, 1800, 1900).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Band {
    pub number: u32,
    pub rat: Rat,
}

impl Band {
    pub fn new(number: u32, rat: Rat) -> Self {
        Self { number, rat }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rat.is_nr() {
            write!(f, "n{} ({})", self.number, self.rat)
        } else {
            write!(f, "B{} ({})", self.number, self.rat)
        }
    }
}

/// Per-RAT band sets carried by one document
///
/// A RAT missing from the map lists no bands for that RAT, the same as an
/// empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandSets(BTreeMap<Rat, BTreeSet<u32>>);

impl BandSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bands for one RAT (merging with bands already given for it)
    pub fn with(mut self, rat: Rat, bands: impl IntoIterator<Item = u32>) -> Self {
        self.0.entry(rat).or_default().extend(bands);
        self
    }

    /// Add the same NR bands to both the SA and NSA sub-modes
    pub fn with_nr(self, bands: impl IntoIterator<Item = u32>) -> Self {
        let bands: Vec<u32> = bands.into_iter().collect();
        self.with(Rat::NrSa, bands.iter().copied())
            .with(Rat::NrNsa, bands)
    }

    pub fn get(&self, rat: Rat) -> Option<&BTreeSet<u32>> {
        self.0.get(&rat)
    }

    pub fn covers(&self, rat: Rat) -> bool {
        self.0.contains_key(&rat)
    }

    /// Total band count across all RATs
    pub fn total(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Short per-RAT count description, e.g. `"3 LTE, 2 NR_SA"`
    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            return "no bands".to_string();
        }
        self.0
            .iter()
            .map(|(rat, bands)| format!("{} {}", bands.len(), rat))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// NV band preference sub-ranges
// ============================================================================

/// Independent NV items that together make up the band preference document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NvRange {
    /// LTE bands 1-64
    LteBase,
    /// LTE bands 65 and above
    LteExtended,
    /// NR standalone bands
    NrSa,
    /// NR non-standalone (EN-DC) bands
    NrNsa,
}

impl NvRange {
    /// Highest LTE band number held by the base NV item
    pub const LTE_BASE_MAX: u32 = 64;

    /// The NV item whose bitmask decides this band, if any
    pub fn covering(band: &Band) -> Option<NvRange> {
        match band.rat {
            Rat::Lte if band.number <= Self::LTE_BASE_MAX => Some(NvRange::LteBase),
            Rat::Lte => Some(NvRange::LteExtended),
            Rat::NrSa => Some(NvRange::NrSa),
            Rat::NrNsa => Some(NvRange::NrNsa),
            Rat::Gsm | Rat::Wcdma => None,
        }
    }
}

/// NV band preference document: enabled bands plus which NV items were present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvPreferences {
    #[serde(default)]
    pub bands: BandSets,
    #[serde(default)]
    pub present_ranges: BTreeSet<NvRange>,
}

impl NvPreferences {
    pub fn new(bands: BandSets) -> Self {
        Self {
            bands,
            present_ranges: BTreeSet::new(),
        }
    }

    pub fn with_range(mut self, range: NvRange) -> Self {
        self.present_ranges.insert(range);
        self
    }

    pub fn is_present(&self, range: NvRange) -> bool {
        self.present_ranges.contains(&range)
    }
}

// ============================================================================
// Stages and statuses
// ============================================================================

/// Pipeline stage, in fixed evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "RFC")]
    Rfc,
    #[serde(rename = "HW_Filter")]
    HwFilter,
    #[serde(rename = "Carrier")]
    Carrier,
    #[serde(rename = "Generic")]
    Generic,
    #[serde(rename = "NV_Preference")]
    NvPreference,
    #[serde(rename = "QXDM")]
    Qxdm,
    #[serde(rename = "UE_Capability")]
    UeCapability,
}

/// How a stage's band list is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageShape {
    AllowList,
    DenyList,
    Observation,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Rfc,
        Stage::HwFilter,
        Stage::Carrier,
        Stage::Generic,
        Stage::NvPreference,
        Stage::Qxdm,
        Stage::UeCapability,
    ];

    pub const FILTERING: [Stage; 5] = [
        Stage::Rfc,
        Stage::HwFilter,
        Stage::Carrier,
        Stage::Generic,
        Stage::NvPreference,
    ];

    pub const OBSERVATION: [Stage; 2] = [Stage::Qxdm, Stage::UeCapability];

    pub fn shape(&self) -> StageShape {
        match self {
            Stage::Rfc | Stage::HwFilter | Stage::NvPreference => StageShape::AllowList,
            Stage::Carrier | Stage::Generic => StageShape::DenyList,
            Stage::Qxdm | Stage::UeCapability => StageShape::Observation,
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.shape() != StageShape::Observation
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Rfc => "RFC",
            Stage::HwFilter => "HW_Filter",
            Stage::Carrier => "Carrier",
            Stage::Generic => "Generic",
            Stage::NvPreference => "NV_Preference",
            Stage::Qxdm => "QXDM",
            Stage::UeCapability => "UE_Capability",
        }
    }

    /// Human-readable document title
    pub fn document_title(&self) -> &'static str {
        match self {
            Stage::Rfc => "RFC XML",
            Stage::HwFilter => "HW Band Filtering",
            Stage::Carrier => "Carrier Policy",
            Stage::Generic => "Generic Restrictions",
            Stage::NvPreference => "MCFG NV Band Pref",
            Stage::Qxdm => "QXDM Log",
            Stage::UeCapability => "UE Capability",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status of one band at one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    /// Stage document not supplied, or its rule does not apply to this band
    #[serde(rename = "N/A")]
    NotApplicable,
    /// An earlier filtering stage already failed this band
    #[serde(rename = "SKIP")]
    Skipped,
}

/// Final disposition of a band after all stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    /// Passes every supplied stage
    Enabled,
    /// Removed by a filtering stage
    Filtered,
    /// Passed configuration but absent from the QXDM log
    MissingInDeviceLog,
    /// Present in QXDM but not advertised in UE capability
    MissingInNetworkCapability,
    /// Not declared by the RF card
    NotSupportedByHardware,
    /// Observed although the hardware does not declare it
    Anomaly,
}

// ============================================================================
// Trace result
// ============================================================================

/// Outcome of tracing one band through every stage
///
/// Constructed once by the tracer; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandTraceResult {
    band: Band,
    stages: BTreeMap<Stage, BandStatus>,
    final_status: FinalStatus,
    filtered_at: Option<Stage>,
    anomaly_reason: Option<String>,
}

impl BandTraceResult {
    pub(crate) fn new(
        band: Band,
        stages: BTreeMap<Stage, BandStatus>,
        final_status: FinalStatus,
        filtered_at: Option<Stage>,
        anomaly_reason: Option<String>,
    ) -> Self {
        Self {
            band,
            stages,
            final_status,
            filtered_at,
            anomaly_reason,
        }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    /// Stage statuses in pipeline order
    pub fn stages(&self) -> &BTreeMap<Stage, BandStatus> {
        &self.stages
    }

    /// Status at one stage (`NotApplicable` if the stage was not recorded)
    pub fn stage(&self, stage: Stage) -> BandStatus {
        self.stages
            .get(&stage)
            .copied()
            .unwrap_or(BandStatus::NotApplicable)
    }

    pub fn final_status(&self) -> FinalStatus {
        self.final_status
    }

    pub fn filtered_at(&self) -> Option<Stage> {
        self.filtered_at
    }

    pub fn anomaly_reason(&self) -> Option<&str> {
        self.anomaly_reason.as_deref()
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered_at.is_some()
    }
}

/// Load status of one input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub name: String,
    pub loaded: bool,
    pub band_count: Option<usize>,
    pub details: String,
}

impl DocumentStatus {
    pub fn not_loaded(stage: Stage) -> Self {
        Self {
            name: stage.document_title().to_string(),
            loaded: false,
            band_count: None,
            details: String::new(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Derive the final status from stage statuses and the filtered flag
///
/// First matching rule wins:
/// 1. RFC fail + observed anywhere → `Anomaly`
/// 2. RFC fail → `NotSupportedByHardware`
/// 3. not filtered, QXDM fail, UE capability supplied → `MissingInDeviceLog`
/// 4. not filtered, UE capability fail, QXDM pass → `MissingInNetworkCapability`
/// 5. not filtered, no observation fail → `Enabled`
/// 6. filtered → `Filtered`
/// 7. otherwise → `Enabled`
pub fn classify(
    stages: &BTreeMap<Stage, BandStatus>,
    filtered: bool,
) -> (FinalStatus, Option<String>) {
    let status = |stage: Stage| {
        stages
            .get(&stage)
            .copied()
            .unwrap_or(BandStatus::NotApplicable)
    };
    let rfc = status(Stage::Rfc);
    let qxdm = status(Stage::Qxdm);
    let ue_cap = status(Stage::UeCapability);

    if rfc == BandStatus::Fail {
        if qxdm == BandStatus::Pass || ue_cap == BandStatus::Pass {
            return (
                FinalStatus::Anomaly,
                Some("Observed in device logs but hardware (RFC) does not support it".to_string()),
            );
        }
        return (FinalStatus::NotSupportedByHardware, None);
    }

    if !filtered {
        if qxdm == BandStatus::Fail && ue_cap != BandStatus::NotApplicable {
            return (
                FinalStatus::MissingInDeviceLog,
                Some("Passed all config stages but missing in QXDM".to_string()),
            );
        }

        if ue_cap == BandStatus::Fail && qxdm == BandStatus::Pass {
            return (
                FinalStatus::MissingInNetworkCapability,
                Some("Present in QXDM but missing in UE Capability".to_string()),
            );
        }

        if qxdm != BandStatus::Fail && ue_cap != BandStatus::Fail {
            return (FinalStatus::Enabled, None);
        }
    }

    if filtered {
        return (FinalStatus::Filtered, None);
    }

    (FinalStatus::Enabled, None)
}
