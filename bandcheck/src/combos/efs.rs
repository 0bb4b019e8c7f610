//! EFS control-file reconciliation
//!
//! The modem firmware can drop combos on purpose through EFS control files
//! (`prune_ca_combos`, `ca_disable`, `cap_control_nrca_enabled`,
//! `cap_control_nrdc_enabled`, `disable_4l_per_band`). A combo defined in RFC but missing from the
//! runtime table for one of those reasons is not a defect; reconciliation
//! re-labels such discrepancies as `PrunedByEfs`.

use super::normalizer::parse_combo_key;
use super::{Combo, ComboType, DataSource, Discrepancy, DiscrepancyType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const PRUNE_CA_COMBOS: &str = "prune_ca_combos";
pub const CA_DISABLE: &str = "ca_disable";
pub const NRCA_ENABLED: &str = "cap_control_nrca_enabled";
pub const NRDC_ENABLED: &str = "cap_control_nrdc_enabled";
pub const DISABLE_4L_PER_BAND: &str = "disable_4l_per_band";

/// MIMO layer count that `disable_4l_per_band` switches off
const FOUR_LAYERS: u8 = 4;

/// One entry of `prune_ca_combos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedCombo {
    pub combo_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcs: Option<u32>,
}

impl PrunedCombo {
    pub fn new(combo_key: impl Into<String>, bcs: Option<u32>) -> Self {
        Self {
            combo_key: combo_key.into(),
            bcs,
        }
    }

    /// Parse a prune entry such as `1A-3A-7A` or `1A-3A-2` (trailing number is the BCS)
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim().trim_end_matches(';');
        let mut bcs = None;
        let mut bands = Vec::new();
        for part in entry.split('-').map(str::trim).filter(|p| !p.is_empty()) {
            if part.chars().all(|c| c.is_ascii_digit()) {
                bcs = part.parse().ok();
            } else {
                bands.push(part);
            }
        }
        if bands.is_empty() {
            return None;
        }
        let combo_key = parse_combo_key(&bands.join("-")).ok()?;
        Some(Self { combo_key, bcs })
    }
}

/// Combined state of the EFS control files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfsControlState {
    #[serde(default)]
    pub ca_disabled: bool,
    #[serde(default = "enabled")]
    pub nrca_enabled: bool,
    #[serde(default = "enabled")]
    pub nrdc_enabled: bool,
    #[serde(default)]
    pub pruned_combos: Vec<PrunedCombo>,
    /// LTE bands on which 4-layer MIMO is disabled
    #[serde(default)]
    pub disabled_4l_bands: BTreeSet<u32>,
    /// Control file name → path it was read from
    #[serde(default)]
    pub source_files: BTreeMap<String, String>,
}

fn enabled() -> bool {
    true
}

impl Default for EfsControlState {
    fn default() -> Self {
        Self {
            ca_disabled: false,
            nrca_enabled: true,
            nrdc_enabled: true,
            pruned_combos: Vec::new(),
            disabled_4l_bands: BTreeSet::new(),
            source_files: BTreeMap::new(),
        }
    }
}

impl EfsControlState {
    /// Whether `prune_ca_combos` lists this combo
    ///
    /// When both the entry and the query carry a BCS they must be equal.
    pub fn is_combo_pruned(&self, combo_key: &str, bcs: Option<u32>) -> bool {
        let key = parse_combo_key(combo_key).unwrap_or_else(|_| combo_key.to_string());
        self.pruned_combos.iter().any(|pruned| {
            let pruned_key =
                parse_combo_key(&pruned.combo_key).unwrap_or_else(|_| pruned.combo_key.clone());
            pruned_key == key
                && match (pruned.bcs, bcs) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        })
    }

    /// Control file that disables a whole combo type, if any
    pub fn disabling_file(&self, combo_type: ComboType) -> Option<&'static str> {
        match combo_type {
            ComboType::LteCa if self.ca_disabled => Some(CA_DISABLE),
            ComboType::Nrca if !self.nrca_enabled => Some(NRCA_ENABLED),
            ComboType::Nrdc if !self.nrdc_enabled => Some(NRDC_ENABLED),
            _ => None,
        }
    }

    /// First LTE component asking for 4-layer MIMO on a band where it is disabled
    pub fn four_layer_disabled_band(&self, combo: &Combo) -> Option<u32> {
        combo
            .lte_components()
            .find(|c| {
                c.mimo_layers.is_some_and(|layers| layers >= FOUR_LAYERS)
                    && self.disabled_4l_bands.contains(&c.band)
            })
            .map(|c| c.band)
    }

    fn file_label(&self, name: &str) -> String {
        match self.source_files.get(name) {
            Some(path) => format!("{} ({})", name, path),
            None => name.to_string(),
        }
    }

    /// Re-label missing-in-runtime-table discrepancies explained by EFS
    pub fn reconcile(&self, discrepancies: Vec<Discrepancy>) -> Vec<Discrepancy> {
        discrepancies
            .into_iter()
            .map(|d| match self.pruning_reason(&d) {
                Some(details) => {
                    debug!("{} explained by EFS: {}", d.combo(), details);
                    Discrepancy::new(
                        DiscrepancyType::PrunedByEfs,
                        d.combo().clone(),
                        d.source_a(),
                        DataSource::Efs,
                    )
                    .with_details(details)
                }
                None => d,
            })
            .collect()
    }

    fn pruning_reason(&self, discrepancy: &Discrepancy) -> Option<String> {
        if discrepancy.discrepancy_type() != DiscrepancyType::MissingInRuntimeTable {
            return None;
        }
        let combo = discrepancy.combo();

        if let Some(file) = self.disabling_file(combo.combo_type()) {
            return Some(format!(
                "{} combos disabled by EFS control file {}",
                combo.combo_type(),
                self.file_label(file)
            ));
        }

        let key = combo.canonical_key();
        let pruned = match combo.bcs() {
            Some(bcs) if !bcs.is_empty() => bcs.iter().any(|b| self.is_combo_pruned(&key, Some(*b))),
            _ => self.is_combo_pruned(&key, None),
        };
        if pruned {
            return Some(format!(
                "Combo pruned by EFS control file {}",
                self.file_label(PRUNE_CA_COMBOS)
            ));
        }

        self.four_layer_disabled_band(combo).map(|band| {
            format!(
                "4-layer MIMO on band {} disabled by EFS control file {}",
                band,
                self.file_label(DISABLE_4L_PER_BAND)
            )
        })
    }
}
