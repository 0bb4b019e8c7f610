//! Combo data model
//!
//! Identity of a combo is its canonical key: LTE components ascending by
//! (band, class), then NR components ascending by (band, class), duplicates
//! removed, joined with `-`. BCS, MIMO layers and provenance never take part
//! in identity.

use super::ComboParseError;
use crate::knowledge::reasoning::{ReasoningResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

/// Carrier aggregation / dual connectivity combination type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComboType {
    /// LTE carrier aggregation
    #[serde(rename = "LTE_CA")]
    LteCa,
    /// E-UTRA NR dual connectivity (NSA)
    #[serde(rename = "ENDC")]
    Endc,
    /// NR carrier aggregation
    #[serde(rename = "NRCA")]
    Nrca,
    /// NR dual connectivity
    #[serde(rename = "NRDC")]
    Nrdc,
}

impl ComboType {
    pub const ALL: [ComboType; 4] = [
        ComboType::LteCa,
        ComboType::Endc,
        ComboType::Nrca,
        ComboType::Nrdc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComboType::LteCa => "LTE_CA",
            ComboType::Endc => "ENDC",
            ComboType::Nrca => "NRCA",
            ComboType::Nrdc => "NRDC",
        }
    }
}

impl fmt::Display for ComboType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a combo collection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    /// RFC XML combo definitions
    Rfc,
    /// Runtime combo table built by the modem (QXDM 0xB826)
    RuntimeTable,
    /// UE capability advertisement
    UeCapability,
    /// EFS pruning / disable control files
    Efs,
    /// RF envelope validation
    EnvelopeValidation,
}

impl DataSource {
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::Rfc => "RFC",
            DataSource::RuntimeTable => "RUNTIME_TABLE",
            DataSource::UeCapability => "UE_CAPABILITY",
            DataSource::Efs => "EFS",
            DataSource::EnvelopeValidation => "ENVELOPE_VALIDATION",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of disagreement between two combo sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyType {
    /// Defined in RFC but not built into the runtime table
    MissingInRuntimeTable,
    /// Built into the runtime table but not defined in RFC
    ExtraInRuntimeTable,
    /// Built but not advertised in UE capability
    MissingInAdvertisedCapability,
    /// Combo present on both sides with disjoint BCS
    BcsMismatch,
    /// Removed on purpose by an EFS control file
    PrunedByEfs,
    /// Removed by RF envelope validation
    EnvelopeFiltered,
}

impl DiscrepancyType {
    /// Severity used when nothing explains the discrepancy
    pub fn default_severity(&self) -> Severity {
        match self {
            DiscrepancyType::MissingInRuntimeTable
            | DiscrepancyType::MissingInAdvertisedCapability => Severity::High,
            DiscrepancyType::ExtraInRuntimeTable | DiscrepancyType::BcsMismatch => {
                Severity::Medium
            }
            DiscrepancyType::PrunedByEfs | DiscrepancyType::EnvelopeFiltered => {
                Severity::Expected
            }
        }
    }

    /// Whether this discrepancy reports a combo as absent somewhere
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            DiscrepancyType::MissingInRuntimeTable | DiscrepancyType::MissingInAdvertisedCapability
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiscrepancyType::MissingInRuntimeTable => "MISSING_IN_RUNTIME_TABLE",
            DiscrepancyType::ExtraInRuntimeTable => "EXTRA_IN_RUNTIME_TABLE",
            DiscrepancyType::MissingInAdvertisedCapability => "MISSING_IN_ADVERTISED_CAPABILITY",
            DiscrepancyType::BcsMismatch => "BCS_MISMATCH",
            DiscrepancyType::PrunedByEfs => "PRUNED_BY_EFS",
            DiscrepancyType::EnvelopeFiltered => "ENVELOPE_FILTERED",
        }
    }
}

impl fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Band component
// ============================================================================

/// One band inside a combo, e.g. `66A` or `n77C`
///
/// Equality and hashing use `(band, band_class, is_nr)` only; MIMO layers
/// are informational.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandComponent {
    pub band: u32,
    pub band_class: char,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimo_layers: Option<u8>,
    #[serde(default)]
    pub is_nr: bool,
}

impl BandComponent {
    pub fn lte(band: u32, band_class: char) -> Self {
        Self {
            band,
            band_class,
            mimo_layers: None,
            is_nr: false,
        }
    }

    pub fn nr(band: u32, band_class: char) -> Self {
        Self {
            band,
            band_class,
            mimo_layers: None,
            is_nr: true,
        }
    }

    pub fn with_mimo(mut self, layers: u8) -> Self {
        self.mimo_layers = Some(layers);
        self
    }

    /// Sort key used by canonical ordering: LTE before NR, then band, then class
    pub(crate) fn order_key(&self) -> (bool, u32, char) {
        (self.is_nr, self.band, self.band_class)
    }
}

impl PartialEq for BandComponent {
    fn eq(&self, other: &Self) -> bool {
        self.band == other.band && self.band_class == other.band_class && self.is_nr == other.is_nr
    }
}

impl Eq for BandComponent {}

impl Hash for BandComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.band.hash(state);
        self.band_class.hash(state);
        self.is_nr.hash(state);
    }
}

impl fmt::Display for BandComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nr {
            write!(f, "n{}{}", self.band, self.band_class)
        } else {
            write!(f, "{}{}", self.band, self.band_class)
        }
    }
}

impl FromStr for BandComponent {
    type Err = ComboParseError;

    /// Parse `66A`, `B66A`, `n77C` (class letter case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ComboParseError::InvalidComponent(text.to_string());

        let (is_nr, rest) = match text.chars().next() {
            Some('n') | Some('N') => (true, &text[1..]),
            Some('b') | Some('B') => (false, &text[1..]),
            _ => (false, text),
        };

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let band: u32 = rest[..digits_end].parse().map_err(|_| invalid())?;

        let mut class_chars = rest[digits_end..].chars();
        let class = class_chars.next().ok_or_else(invalid)?;
        if class_chars.next().is_some() {
            return Err(invalid());
        }

        let class = class.to_ascii_uppercase();
        if !('A'..='I').contains(&class) {
            return Err(ComboParseError::InvalidBandClass {
                component: text.to_string(),
                class,
            });
        }

        Ok(Self {
            band,
            band_class: class,
            mimo_layers: None,
            is_nr,
        })
    }
}

// ============================================================================
// Combo
// ============================================================================

/// A carrier aggregation or dual connectivity combination
///
/// Equality and hashing follow the canonical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ComboFields")]
pub struct Combo {
    combo_type: ComboType,
    components: Vec<BandComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bcs: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_string: Option<String>,
}

#[derive(Deserialize)]
struct ComboFields {
    combo_type: ComboType,
    components: Vec<BandComponent>,
    #[serde(default)]
    bcs: Option<BTreeSet<u32>>,
    #[serde(default)]
    source: Option<DataSource>,
    #[serde(default)]
    raw_string: Option<String>,
}

impl TryFrom<ComboFields> for Combo {
    type Error = ComboParseError;

    fn try_from(fields: ComboFields) -> Result<Self, Self::Error> {
        if fields.components.is_empty() {
            return Err(ComboParseError::Empty);
        }
        Ok(Self {
            combo_type: fields.combo_type,
            components: fields.components,
            bcs: fields.bcs,
            source: fields.source,
            raw_string: fields.raw_string,
        })
    }
}

impl Combo {
    /// Create a combo from its components
    ///
    /// # Panics
    /// Panics if `components` is empty.
    pub fn new(combo_type: ComboType, components: Vec<BandComponent>) -> Self {
        assert!(
            !components.is_empty(),
            "combo of type {} must have at least one band component",
            combo_type
        );
        Self {
            combo_type,
            components,
            bcs: None,
            source: None,
            raw_string: None,
        }
    }

    /// Parse a `-`/`+`/`_` separated combo string of a known type
    pub fn parse(combo_type: ComboType, text: &str) -> Result<Self, ComboParseError> {
        let components = parse_components(text)?;
        Ok(Self::new(combo_type, components).with_raw_string(text.trim()))
    }

    pub fn with_bcs(mut self, bcs: impl IntoIterator<Item = u32>) -> Self {
        self.bcs = Some(bcs.into_iter().collect());
        self
    }

    pub(crate) fn with_bcs_option(mut self, bcs: Option<BTreeSet<u32>>) -> Self {
        self.bcs = bcs;
        self
    }

    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_raw_string(mut self, raw: impl Into<String>) -> Self {
        self.raw_string = Some(raw.into());
        self
    }

    pub fn combo_type(&self) -> ComboType {
        self.combo_type
    }

    /// Components in the order they were given
    pub fn components(&self) -> &[BandComponent] {
        &self.components
    }

    pub fn bcs(&self) -> Option<&BTreeSet<u32>> {
        self.bcs.as_ref()
    }

    pub fn source(&self) -> Option<DataSource> {
        self.source
    }

    pub fn raw_string(&self) -> Option<&str> {
        self.raw_string.as_deref()
    }

    /// Components in canonical order: uppercase classes, deduplicated, LTE then NR
    pub fn canonical_components(&self) -> Vec<BandComponent> {
        let mut components: Vec<BandComponent> = self
            .components
            .iter()
            .map(|c| BandComponent {
                band_class: c.band_class.to_ascii_uppercase(),
                ..*c
            })
            .collect();
        components.sort_by_key(BandComponent::order_key);
        components.dedup();
        components
    }

    /// Canonical identity key, e.g. `1A-3A-n77A`
    pub fn canonical_key(&self) -> String {
        self.canonical_components()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn lte_components(&self) -> impl Iterator<Item = &BandComponent> {
        self.components.iter().filter(|c| !c.is_nr)
    }

    pub fn nr_components(&self) -> impl Iterator<Item = &BandComponent> {
        self.components.iter().filter(|c| c.is_nr)
    }

    /// Distinct band numbers (LTE and NR)
    pub fn bands(&self) -> BTreeSet<u32> {
        self.components.iter().map(|c| c.band).collect()
    }

    /// Number of distinct components
    pub fn band_count(&self) -> usize {
        self.canonical_components().len()
    }
}

impl PartialEq for Combo {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}

impl Eq for Combo {}

impl Hash for Combo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_key().hash(state);
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

impl FromStr for Combo {
    type Err = ComboParseError;

    /// Parse a combo string, inferring the type from its components
    ///
    /// All LTE → `LteCa`, all NR → `Nrca`, mixed → `Endc`. NR-DC combos
    /// cannot be told apart from NR-CA by their bands; use [`Combo::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = parse_components(s)?;
        let has_lte = components.iter().any(|c| !c.is_nr);
        let has_nr = components.iter().any(|c| c.is_nr);
        let combo_type = match (has_lte, has_nr) {
            (true, true) => ComboType::Endc,
            (false, true) => ComboType::Nrca,
            _ => ComboType::LteCa,
        };
        Ok(Combo::new(combo_type, components).with_raw_string(s.trim()))
    }
}

/// Split a loose combo string into components
///
/// Accepts `-`, `+`, `_`, `,` and whitespace as separators.
pub(crate) fn parse_components(text: &str) -> Result<Vec<BandComponent>, ComboParseError> {
    let components = text
        .split(|c: char| matches!(c, '-' | '+' | '_' | ',') || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(BandComponent::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if components.is_empty() {
        return Err(ComboParseError::Empty);
    }
    Ok(components)
}

// ============================================================================
// Collections and comparison results
// ============================================================================

/// Combos from one source for one combo type, keyed by canonical key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ComboSetFields")]
pub struct ComboSet {
    source: DataSource,
    combo_type: ComboType,
    combos: BTreeMap<String, Combo>,
}

#[derive(Deserialize)]
struct ComboSetFields {
    source: DataSource,
    combo_type: ComboType,
    #[serde(default)]
    combos: BTreeMap<String, Combo>,
}

impl TryFrom<ComboSetFields> for ComboSet {
    type Error = ComboParseError;

    /// Re-key by canonical key; stored keys are not trusted
    fn try_from(fields: ComboSetFields) -> Result<Self, Self::Error> {
        let mut set = ComboSet::new(fields.source, fields.combo_type);
        for (key, combo) in fields.combos {
            if combo.combo_type() != set.combo_type {
                return Err(ComboParseError::TypeMismatch {
                    key,
                    expected: set.combo_type,
                    found: combo.combo_type(),
                });
            }
            set.insert(combo);
        }
        Ok(set)
    }
}

impl ComboSet {
    pub fn new(source: DataSource, combo_type: ComboType) -> Self {
        Self {
            source,
            combo_type,
            combos: BTreeMap::new(),
        }
    }

    /// Insert a combo, tagging it with this set's source
    ///
    /// A combo with the same canonical key replaces the previous one.
    ///
    /// # Panics
    /// Panics if the combo's type differs from the set's type.
    pub fn insert(&mut self, combo: Combo) {
        assert_eq!(
            combo.combo_type(),
            self.combo_type,
            "cannot insert {} combo {} into {} set",
            combo.combo_type(),
            combo,
            self.combo_type
        );
        let combo = combo.with_source(self.source);
        self.combos.insert(combo.canonical_key(), combo);
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn combo_type(&self) -> ComboType {
        self.combo_type
    }

    pub fn get(&self, key: &str) -> Option<&Combo> {
        self.combos.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.combos.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }

    /// Canonical keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.combos.keys().map(String::as_str)
    }

    pub fn key_set(&self) -> BTreeSet<String> {
        self.combos.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combo> {
        self.combos.values()
    }
}

impl Extend<Combo> for ComboSet {
    fn extend<I: IntoIterator<Item = Combo>>(&mut self, iter: I) {
        for combo in iter {
            self.insert(combo);
        }
    }
}

/// Outcome of comparing two combo sets of the same type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub source_a: DataSource,
    pub source_b: DataSource,
    pub combo_type: ComboType,
    pub common: BTreeSet<String>,
    pub only_in_a: BTreeSet<String>,
    pub only_in_b: BTreeSet<String>,
    pub bcs_mismatches: Vec<Discrepancy>,
}

impl ComparisonResult {
    pub fn total_discrepancies(&self) -> usize {
        self.only_in_a.len() + self.only_in_b.len() + self.bcs_mismatches.len()
    }

    /// Share of keys present on both sides, 100.0 when both sides are empty
    pub fn match_percentage(&self) -> f64 {
        let total = self.common.len() + self.only_in_a.len() + self.only_in_b.len();
        if total == 0 {
            return 100.0;
        }
        self.common.len() as f64 / total as f64 * 100.0
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }
}

// ============================================================================
// Discrepancy
// ============================================================================

/// A disagreement about one combo between two sources
///
/// The reason is attached once by the reasoning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    discrepancy_type: DiscrepancyType,
    combo: Combo,
    source_a: DataSource,
    source_b: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<ReasoningResult>,
}

impl Discrepancy {
    pub fn new(
        discrepancy_type: DiscrepancyType,
        combo: Combo,
        source_a: DataSource,
        source_b: DataSource,
    ) -> Self {
        Self {
            discrepancy_type,
            combo,
            source_a,
            source_b,
            details: None,
            reason: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn discrepancy_type(&self) -> DiscrepancyType {
        self.discrepancy_type
    }

    pub fn combo(&self) -> &Combo {
        &self.combo
    }

    pub fn source_a(&self) -> DataSource {
        self.source_a
    }

    pub fn source_b(&self) -> DataSource {
        self.source_b
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn reason(&self) -> Option<&ReasoningResult> {
        self.reason.as_ref()
    }

    pub(crate) fn set_reason(&mut self, reason: ReasoningResult) {
        self.reason = Some(reason);
    }

    /// Severity from the attached reason, else the type's default
    pub fn severity(&self) -> Severity {
        self.reason
            .as_ref()
            .map(|r| r.severity)
            .unwrap_or_else(|| self.discrepancy_type.default_severity())
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} vs {})",
            self.discrepancy_type, self.combo, self.source_a, self.source_b
        )
    }
}
