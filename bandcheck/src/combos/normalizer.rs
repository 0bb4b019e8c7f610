//! Combo canonicalization
//!
//! Normalization rules:
//! 1. Band class letters are uppercased
//! 2. Identical components `(band, class, is_nr)` are deduplicated
//! 3. Components are sorted LTE first, then NR, each ascending by (band, class)

use super::models::parse_components;
use super::{Combo, ComboParseError, ComboSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Highest BCS index accepted from any source
pub const MAX_BCS: u32 = 255;

/// Canonical identity key of a combo
pub fn canonical_key(combo: &Combo) -> String {
    combo.canonical_key()
}

/// Copy of `combo` with canonical components; BCS and provenance are kept
pub fn normalize(combo: &Combo) -> Combo {
    let mut normalized = Combo::new(combo.combo_type(), combo.canonical_components())
        .with_bcs_option(combo.bcs().cloned());
    if let Some(source) = combo.source() {
        normalized = normalized.with_source(source);
    }
    if let Some(raw) = combo.raw_string() {
        normalized = normalized.with_raw_string(raw);
    }
    normalized
}

/// Normalize every combo of a set into a new set of the same source and type
pub fn normalize_set(set: &ComboSet) -> ComboSet {
    let mut normalized = ComboSet::new(set.source(), set.combo_type());
    normalized.extend(set.iter().map(normalize));
    normalized
}

/// Whether two combos share a canonical key
pub fn combos_equivalent(a: &Combo, b: &Combo) -> bool {
    a.canonical_key() == b.canonical_key()
}

/// BCS compatibility
///
/// `None` on either side means "all BCS" and matches anything; two declared
/// sets match iff they intersect.
pub fn bcs_matches(a: Option<&BTreeSet<u32>>, b: Option<&BTreeSet<u32>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_disjoint(b),
        _ => true,
    }
}

/// Drop BCS values above [`MAX_BCS`]; an empty result becomes `None`
pub fn normalize_bcs(bcs: Option<BTreeSet<u32>>) -> Option<BTreeSet<u32>> {
    let valid: BTreeSet<u32> = bcs?.into_iter().filter(|b| *b <= MAX_BCS).collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid)
    }
}

/// Canonical key from a loosely spelled combo, e.g. `B66A+n71A` or `66a_n71a`
pub fn parse_combo_key(text: &str) -> Result<String, ComboParseError> {
    let mut components = parse_components(text)?;
    components.sort_by_key(|c| c.order_key());
    components.dedup();
    Ok(components
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("-"))
}

/// Combos grouped by their number of distinct components
pub fn group_by_band_count(set: &ComboSet) -> BTreeMap<usize, Vec<&Combo>> {
    let mut groups: BTreeMap<usize, Vec<&Combo>> = BTreeMap::new();
    for combo in set.iter() {
        groups.entry(combo.band_count()).or_default().push(combo);
    }
    groups
}

/// Distinct LTE and NR band numbers used by a set of combos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueBands {
    pub lte: BTreeSet<u32>,
    pub nr: BTreeSet<u32>,
}

impl UniqueBands {
    pub fn merge(&mut self, other: UniqueBands) {
        self.lte.extend(other.lte);
        self.nr.extend(other.nr);
    }
}

pub fn extract_unique_bands(set: &ComboSet) -> UniqueBands {
    let mut bands = UniqueBands::default();
    for component in set.iter().flat_map(|combo| combo.components()) {
        if component.is_nr {
            bands.nr.insert(component.band);
        } else {
            bands.lte.insert(component.band);
        }
    }
    bands
}
