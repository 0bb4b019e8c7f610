//! Knowledge-base context
//!
//! Band-level restrictions, combo-level restrictions and per-carrier combo
//! requirements, plus the active region and carrier they are evaluated
//! against. Built once per run and read-only afterwards.
//!
//! Combo keys are stored canonically (`66A-n71A`) and carrier names in
//! lowercase, whichever way the caller spelled them.

pub mod reasoning;

pub use reasoning::{ActionItem, ReasonType, ReasoningEngine, ReasoningResult, Severity};

use crate::combos::normalizer::parse_combo_key;
use bandcheck_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

/// Region names treated as North America
const NORTH_AMERICA: [&str; 5] = ["NA", "NORTH_AMERICA", "NORTH AMERICA", "US", "USA"];

/// Category of a knowledge-base restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionType {
    Regional,
    Regulatory,
    Carrier,
    HwVariant,
}

/// A band restricted in some regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRestriction {
    pub band: u32,
    pub restriction_type: RestrictionType,
    /// Regions the restriction applies to; empty means everywhere
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub source_file: String,
}

impl BandRestriction {
    pub fn new(band: u32, restriction_type: RestrictionType, reason: impl Into<String>) -> Self {
        Self {
            band,
            restriction_type,
            regions: Vec::new(),
            reason: reason.into(),
            source_file: String::new(),
        }
    }

    pub fn in_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = source_file.into();
        self
    }

    /// Whether this restriction applies in `region`
    ///
    /// No listed regions applies everywhere; no active region applies
    /// everything; otherwise region names compare case-insensitively.
    pub fn applies_to(&self, region: Option<&str>) -> bool {
        if self.regions.is_empty() {
            return true;
        }
        match region {
            Some(region) => self.regions.iter().any(|r| r.eq_ignore_ascii_case(region)),
            None => true,
        }
    }
}

/// A specific combo restricted by policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboRestriction {
    pub combo_key: String,
    pub restriction_type: RestrictionType,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub source_file: String,
}

impl ComboRestriction {
    pub fn new(
        combo_key: impl Into<String>,
        restriction_type: RestrictionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            combo_key: combo_key.into(),
            restriction_type,
            reason: reason.into(),
            source_file: String::new(),
        }
    }

    pub fn from_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = source_file.into();
        self
    }
}

/// Combos a carrier requires, allows or excludes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRequirement {
    pub carrier_name: String,
    #[serde(default)]
    pub required_combos: BTreeSet<String>,
    #[serde(default)]
    pub optional_combos: BTreeSet<String>,
    #[serde(default)]
    pub excluded_combos: BTreeSet<String>,
    /// Combo key → free-form note
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

impl CarrierRequirement {
    pub fn new(carrier_name: impl Into<String>) -> Self {
        Self {
            carrier_name: carrier_name.into(),
            ..Self::default()
        }
    }

    pub fn require(mut self, combo: &str) -> Self {
        self.required_combos.insert(canonical_or_raw(combo));
        self
    }

    pub fn allow(mut self, combo: &str) -> Self {
        self.optional_combos.insert(canonical_or_raw(combo));
        self
    }

    pub fn exclude(mut self, combo: &str) -> Self {
        self.excluded_combos.insert(canonical_or_raw(combo));
        self
    }

    pub fn with_note(mut self, combo: &str, note: impl Into<String>) -> Self {
        self.notes.insert(canonical_or_raw(combo), note.into());
        self
    }

    fn normalized(self) -> Self {
        let canon = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.iter().map(|k| canonical_or_raw(k)).collect()
        };
        Self {
            carrier_name: self.carrier_name,
            required_combos: canon(self.required_combos),
            optional_combos: canon(self.optional_combos),
            excluded_combos: canon(self.excluded_combos),
            notes: self
                .notes
                .into_iter()
                .map(|(k, v)| (canonical_or_raw(&k), v))
                .collect(),
        }
    }
}

/// Canonical key for a loosely spelled combo, or the text itself if it does not parse
fn canonical_or_raw(combo: &str) -> String {
    match parse_combo_key(combo) {
        Ok(key) => key,
        Err(e) => {
            warn!("Keeping unparseable knowledge-base combo '{}' as written: {}", combo, e);
            combo.trim().to_string()
        }
    }
}

/// Everything the reasoning engine may consult
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseContext {
    #[serde(default)]
    band_restrictions: BTreeMap<u32, Vec<BandRestriction>>,
    #[serde(default)]
    combo_restrictions: BTreeMap<String, Vec<ComboRestriction>>,
    #[serde(default)]
    carrier_requirements: BTreeMap<String, CarrierRequirement>,
    #[serde(default)]
    active_region: Option<String>,
    #[serde(default)]
    active_carrier: Option<String>,
}

impl KnowledgeBaseContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_band_restriction(mut self, restriction: BandRestriction) -> Self {
        self.band_restrictions
            .entry(restriction.band)
            .or_default()
            .push(restriction);
        self
    }

    pub fn with_combo_restriction(mut self, mut restriction: ComboRestriction) -> Self {
        restriction.combo_key = canonical_or_raw(&restriction.combo_key);
        self.combo_restrictions
            .entry(restriction.combo_key.clone())
            .or_default()
            .push(restriction);
        self
    }

    pub fn with_carrier_requirement(mut self, requirement: CarrierRequirement) -> Self {
        let requirement = requirement.normalized();
        self.carrier_requirements
            .insert(requirement.carrier_name.to_lowercase(), requirement);
        self
    }

    pub fn with_active_region(mut self, region: impl Into<String>) -> Self {
        self.active_region = Some(region.into());
        self
    }

    pub fn with_active_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.active_carrier = Some(carrier.into());
        self
    }

    /// Re-key a deserialized context: canonical combo keys, lowercase carriers
    pub fn normalized(self) -> Self {
        let mut context = Self {
            active_region: self.active_region,
            active_carrier: self.active_carrier,
            ..Self::default()
        };
        for restriction in self.band_restrictions.into_values().flatten() {
            context = context.with_band_restriction(restriction);
        }
        for restriction in self.combo_restrictions.into_values().flatten() {
            context = context.with_combo_restriction(restriction);
        }
        for requirement in self.carrier_requirements.into_values() {
            context = context.with_carrier_requirement(requirement);
        }
        context
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parse a JSON knowledge-base document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let context: KnowledgeBaseContext = serde_json::from_str(content)?;
        Ok(context.normalized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let context = Self::from_json_str(&content)?;
        debug!(
            "Loaded knowledge base {}: {} band rules, {} combo rules, {} carriers",
            path.display(),
            context.band_restrictions.values().map(Vec::len).sum::<usize>(),
            context.combo_restrictions.values().map(Vec::len).sum::<usize>(),
            context.carrier_requirements.len()
        );
        Ok(context)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn active_region(&self) -> Option<&str> {
        self.active_region.as_deref()
    }

    pub fn active_carrier(&self) -> Option<&str> {
        self.active_carrier.as_deref()
    }

    pub fn set_active_region(&mut self, region: Option<String>) {
        self.active_region = region;
    }

    pub fn set_active_carrier(&mut self, carrier: Option<String>) {
        self.active_carrier = carrier;
    }

    /// Whether the active region is North America (NA, US, USA, ...)
    pub fn is_north_america(&self) -> bool {
        self.active_region
            .as_deref()
            .map(str::trim)
            .is_some_and(|region| NORTH_AMERICA.iter().any(|na| na.eq_ignore_ascii_case(region)))
    }

    pub fn band_restrictions(&self, band: u32) -> &[BandRestriction] {
        self.band_restrictions
            .get(&band)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Band restrictions in force for the active region
    pub fn applicable_band_restrictions(&self, band: u32) -> impl Iterator<Item = &BandRestriction> {
        let region = self.active_region.as_deref();
        self.band_restrictions(band)
            .iter()
            .filter(move |r| r.applies_to(region))
    }

    pub fn combo_restrictions(&self, combo_key: &str) -> &[ComboRestriction] {
        self.combo_restrictions
            .get(&canonical_or_raw(combo_key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Requirement record for a carrier (case-insensitive)
    pub fn carrier_requirement(&self, carrier: &str) -> Option<&CarrierRequirement> {
        self.carrier_requirements.get(&carrier.to_lowercase())
    }

    /// Requirement record of the active carrier
    pub fn active_carrier_requirement(&self) -> Option<&CarrierRequirement> {
        self.carrier_requirement(self.active_carrier.as_deref()?)
    }

    /// Whether any restriction on `band` applies in `region`
    pub fn is_band_restricted(&self, band: u32, region: Option<&str>) -> bool {
        self.band_restrictions(band)
            .iter()
            .any(|r| r.applies_to(region))
    }

    pub fn is_combo_excluded_by_carrier(&self, combo_key: &str, carrier: &str) -> bool {
        self.carrier_requirement(carrier)
            .is_some_and(|req| req.excluded_combos.contains(&canonical_or_raw(combo_key)))
    }

    pub fn is_empty(&self) -> bool {
        self.band_restrictions.is_empty()
            && self.combo_restrictions.is_empty()
            && self.carrier_requirements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restriction_region_applicability() {
        let anywhere = BandRestriction::new(71, RestrictionType::Regional, "not certified");
        assert!(anywhere.applies_to(None));
        assert!(anywhere.applies_to(Some("EMEA")));

        let apac = anywhere.clone().in_regions(["APAC", "EMEA"]);
        assert!(apac.applies_to(None));
        assert!(apac.applies_to(Some("emea")));
        assert!(!apac.applies_to(Some("NA")));
    }

    #[test]
    fn test_combo_keys_are_canonical() {
        let kb = KnowledgeBaseContext::new()
            .with_combo_restriction(ComboRestriction::new("B66A+n71A", RestrictionType::Carrier, ""));

        assert_eq!(kb.combo_restrictions("66A-n71A").len(), 1);
        assert_eq!(kb.combo_restrictions("n71a_66a").len(), 1);
        assert!(kb.combo_restrictions("2A-66A").is_empty());
    }

    #[test]
    fn test_carrier_lookup_case_insensitive() {
        let kb = KnowledgeBaseContext::new()
            .with_carrier_requirement(CarrierRequirement::new("Verizon").exclude("13a+n77a"))
            .with_active_carrier("VERIZON");

        assert!(kb.carrier_requirement("verizon").is_some());
        assert!(kb.is_combo_excluded_by_carrier("13A-n77A", "Verizon"));
        assert!(kb.active_carrier_requirement().is_some());
    }

    #[test]
    fn test_north_america_aliases() {
        for region in ["NA", "us", "USA", "North America", "north_america"] {
            assert!(KnowledgeBaseContext::new().with_active_region(region).is_north_america());
        }
        assert!(!KnowledgeBaseContext::new().with_active_region("EMEA").is_north_america());
        assert!(!KnowledgeBaseContext::new().is_north_america());
    }

    #[test]
    fn test_from_json_normalizes() {
        let json = r#"{
            "band_restrictions": {
                "71": [{"band": 71, "restriction_type": "regional", "regions": ["APAC"], "reason": "not certified"}]
            },
            "combo_restrictions": {
                "b2a+b66a": [{"combo_key": "b2a+b66a", "restriction_type": "regulatory"}]
            },
            "carrier_requirements": {
                "AT&T": {"carrier_name": "AT&T", "required_combos": ["66a_2a"]}
            },
            "active_region": "APAC"
        }"#;

        let kb = KnowledgeBaseContext::from_json_str(json).unwrap();
        assert_eq!(kb.band_restrictions(71).len(), 1);
        assert!(kb.is_band_restricted(71, Some("apac")));
        assert_eq!(kb.combo_restrictions("2A-66A")[0].combo_key, "2A-66A");
        let att = kb.carrier_requirement("at&t").unwrap();
        assert!(att.required_combos.contains("2A-66A"));
        assert_eq!(kb.active_region(), Some("APAC"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(KnowledgeBaseContext::load(&dir.path().join("kb.json")).is_err());
    }
}
