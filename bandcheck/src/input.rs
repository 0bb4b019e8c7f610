//! Analysis input document
//!
//! The JSON document handed to a run by upstream parsers:
//!
//! ```json
//! {
//!   "bands": {
//!     "rfc": { "LTE": [1, 3, 7], "NR_SA": [77, 78] },
//!     "hw_filter": { "LTE": [1, 3] },
//!     "nv_preferences": { "bands": { "LTE": [1, 3] }, "present_ranges": ["LTE_BASE"] }
//!   },
//!   "combos": {
//!     "defined": { "LTE_CA": [{ "key": "1A-3A" }, { "key": "1A-7A", "bcs": [0, 1] }] },
//!     "built": { "LTE_CA": [{ "key": "1A-3A" }] }
//!   },
//!   "efs": { "pruned_combos": [{ "combo_key": "1A-7A" }] }
//! }
//! ```
//!
//! Every section and every stage is optional; an absent stage is reported as
//! not applicable.

use crate::bands::{BandSets, BandTracer, NvPreferences};
use crate::combos::normalizer::normalize_bcs;
use crate::combos::{Combo, ComboCollection, ComboSet, ComboType, DataSource, EfsControlState};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Band documents, one optional entry per stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandInput {
    #[serde(default)]
    pub rfc: Option<BandSets>,
    #[serde(default)]
    pub hw_filter: Option<BandSets>,
    #[serde(default)]
    pub carrier_exclusions: Option<BandSets>,
    #[serde(default)]
    pub generic_exclusions: Option<BandSets>,
    #[serde(default)]
    pub nv_preferences: Option<NvPreferences>,
    #[serde(default)]
    pub observed: Option<BandSets>,
    #[serde(default)]
    pub advertised: Option<BandSets>,
}

impl BandInput {
    pub fn is_empty(&self) -> bool {
        self.rfc.is_none()
            && self.hw_filter.is_none()
            && self.carrier_exclusions.is_none()
            && self.generic_exclusions.is_none()
            && self.nv_preferences.is_none()
            && self.observed.is_none()
            && self.advertised.is_none()
    }

    /// A fresh tracer loaded with every supplied document
    pub fn tracer(&self) -> BandTracer {
        let mut tracer = BandTracer::new();
        if let Some(bands) = &self.rfc {
            tracer.set_rfc_bands(bands.clone());
        }
        if let Some(bands) = &self.hw_filter {
            tracer.set_hw_filter_bands(bands.clone());
        }
        if let Some(bands) = &self.carrier_exclusions {
            tracer.set_carrier_exclusions(bands.clone());
        }
        if let Some(bands) = &self.generic_exclusions {
            tracer.set_generic_exclusions(bands.clone());
        }
        if let Some(prefs) = &self.nv_preferences {
            tracer.set_nv_preferences(prefs.clone());
        }
        if let Some(bands) = &self.observed {
            tracer.set_observed_bands(bands.clone());
        }
        if let Some(bands) = &self.advertised {
            tracer.set_advertised_bands(bands.clone());
        }
        tracer
    }
}

/// One combo as written by a parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcs: Option<BTreeSet<u32>>,
    /// MIMO layers applied to every component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimo: Option<u8>,
}

impl ComboSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bcs: None,
            mimo: None,
        }
    }

    fn to_combo(&self, combo_type: ComboType, collection: &str) -> Result<Combo> {
        let combo = Combo::parse(combo_type, &self.key).map_err(|error| {
            AnalysisError::InvalidCombo {
                collection: collection.to_string(),
                key: self.key.clone(),
                error,
            }
        })?;

        let combo = match self.mimo {
            Some(layers) => {
                let components = combo
                    .components()
                    .iter()
                    .map(|c| c.with_mimo(layers))
                    .collect();
                let mut rebuilt = Combo::new(combo_type, components).with_raw_string(self.key.trim());
                if let Some(bcs) = combo.bcs() {
                    rebuilt = rebuilt.with_bcs(bcs.iter().copied());
                }
                rebuilt
            }
            None => combo,
        };

        Ok(combo.with_bcs_option(normalize_bcs(self.bcs.clone())))
    }
}

/// Raw combo lists for one source
pub type ComboSpecs = BTreeMap<ComboType, Vec<ComboSpec>>;

/// Combo lists for the three sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboInput {
    #[serde(default)]
    pub defined: ComboSpecs,
    #[serde(default)]
    pub built: ComboSpecs,
    #[serde(default)]
    pub advertised: ComboSpecs,
}

impl ComboInput {
    pub fn is_empty(&self) -> bool {
        [&self.defined, &self.built, &self.advertised]
            .iter()
            .all(|specs| specs.values().all(Vec::is_empty))
    }

    pub fn defined_collection(&self) -> Result<ComboCollection> {
        to_collection(&self.defined, DataSource::Rfc, "defined")
    }

    pub fn built_collection(&self) -> Result<ComboCollection> {
        to_collection(&self.built, DataSource::RuntimeTable, "built")
    }

    pub fn advertised_collection(&self) -> Result<ComboCollection> {
        to_collection(&self.advertised, DataSource::UeCapability, "advertised")
    }
}

fn to_collection(specs: &ComboSpecs, source: DataSource, name: &str) -> Result<ComboCollection> {
    let mut collection = ComboCollection::new();
    for (combo_type, list) in specs {
        let mut set = ComboSet::new(source, *combo_type);
        for spec in list {
            set.insert(spec.to_combo(*combo_type, name)?);
        }
        collection.insert(*combo_type, set);
    }
    Ok(collection)
}

/// Complete input of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisInput {
    #[serde(default)]
    pub bands: Option<BandInput>,
    #[serde(default)]
    pub combos: Option<ComboInput>,
    #[serde(default)]
    pub efs: Option<EfsControlState>,
}

impl AnalysisInput {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn has_bands(&self) -> bool {
        self.bands.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn has_combos(&self) -> bool {
        self.combos.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Reject a document that carries neither bands nor combos
    pub fn validate(&self) -> Result<()> {
        if !self.has_bands() && !self.has_combos() {
            return Err(AnalysisError::EmptyInput);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::{NvRange, Rat, Stage};

    #[test]
    fn test_empty_document_rejected() {
        let input = AnalysisInput::from_json_str("{}").unwrap();
        assert!(matches!(input.validate(), Err(AnalysisError::EmptyInput)));

        let hollow = AnalysisInput::from_json_str(r#"{"bands": {}, "combos": {"defined": {"LTE_CA": []}}}"#)
            .unwrap();
        assert!(matches!(hollow.validate(), Err(AnalysisError::EmptyInput)));
    }

    #[test]
    fn test_band_input_loads_tracer() {
        let input = AnalysisInput::from_json_str(
            r#"{
                "bands": {
                    "rfc": {"LTE": [1, 3, 66]},
                    "nv_preferences": {"bands": {"LTE": [1]}, "present_ranges": ["LTE_BASE"]}
                }
            }"#,
        )
        .unwrap();
        input.validate().unwrap();

        let bands = input.bands.unwrap();
        assert!(bands.nv_preferences.as_ref().unwrap().is_present(NvRange::LteBase));

        let tracer = bands.tracer();
        let status = tracer.document_status();
        assert!(status[&Stage::Rfc].loaded);
        assert!(status[&Stage::NvPreference].loaded);
        assert!(!status[&Stage::Qxdm].loaded);
        assert_eq!(tracer.bands_of_interest(Rat::Lte).len(), 3);
    }

    #[test]
    fn test_combo_specs_become_sets() {
        let input = AnalysisInput::from_json_str(
            r#"{
                "combos": {
                    "defined": {"ENDC": [{"key": "n77A-66A", "bcs": [1, 300]}, {"key": "2A-n71A", "mimo": 4}]}
                }
            }"#,
        )
        .unwrap();

        let defined = input.combos.unwrap().defined_collection().unwrap();
        let endc = &defined[&ComboType::Endc];
        assert_eq!(endc.source(), DataSource::Rfc);

        let combo = endc.get("66A-n77A").unwrap();
        assert_eq!(combo.bcs(), Some(&BTreeSet::from([1])));

        let mimo = endc.get("2A-n71A").unwrap();
        assert!(mimo.components().iter().all(|c| c.mimo_layers == Some(4)));
    }

    #[test]
    fn test_invalid_combo_names_collection() {
        let input = ComboInput {
            built: BTreeMap::from([(ComboType::LteCa, vec![ComboSpec::new("1A-XX")])]),
            ..ComboInput::default()
        };
        let err = input.built_collection().unwrap_err();
        assert!(err.to_string().contains("built"));
        assert!(matches!(err, AnalysisError::InvalidCombo { .. }));
    }
}
