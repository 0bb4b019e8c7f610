//! Reasoning engine: explains why a combo discrepancy exists
//!
//! The engine never filters discrepancies; it attaches an explanation, a
//! severity and a recommended action to each one.
//!
//! # Rule order (first match wins)
//! 1. EFS pruning / envelope filtering → `expected`
//! 2. Band restriction applicable to the active region
//! 3. Combo-level restriction → `expected`
//! 4. Active carrier requirement (excluded → `expected`, required but missing → `critical`)
//! 5. Pattern heuristics (mmWave, band 14, band 71, BCS, extra in runtime table)
//! 6. No explanation: severity defaults by discrepancy type

use super::{BandRestriction, KnowledgeBaseContext, RestrictionType};
use crate::combos::efs::PRUNE_CA_COMBOS;
use crate::combos::{Discrepancy, DiscrepancyType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Lowest NR band number in the mmWave (FR2) range
const MMWAVE_MIN_BAND: u32 = 257;

/// Public-safety band deployed in North America only
const FIRSTNET_BAND: u32 = 14;

/// Carrier-specific low band
const BAND_71: u32 = 71;

// ============================================================================
// Severity and reason categories
// ============================================================================

/// How much attention a discrepancy needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Known restriction, no action needed
    Expected,
    /// Informational
    Low,
    /// Should be reviewed
    Medium,
    /// Potential configuration error
    High,
    /// Likely bug or serious misconfiguration
    Critical,
    Unknown,
}

impl Severity {
    /// Report order, most urgent first
    pub const TRIAGE_ORDER: [Severity; 6] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Expected,
        Severity::Unknown,
    ];

    /// One level more severe (`Critical` and `Unknown` stay put)
    pub fn escalate(self) -> Self {
        match self {
            Severity::Expected => Severity::Low,
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
            Severity::Unknown => Severity::Unknown,
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Expected => "expected",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of knowledge explained a discrepancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonType {
    Efs,
    Envelope,
    Regional,
    Regulatory,
    Carrier,
    HwVariant,
    Heuristic,
}

impl ReasonType {
    pub fn label(&self) -> &'static str {
        match self {
            ReasonType::Efs => "EFS configuration",
            ReasonType::Envelope => "RF envelope",
            ReasonType::Regional => "Regional restriction",
            ReasonType::Regulatory => "Regulatory restriction",
            ReasonType::Carrier => "Carrier policy",
            ReasonType::HwVariant => "Hardware variant",
            ReasonType::Heuristic => "Heuristic",
        }
    }
}

impl From<RestrictionType> for ReasonType {
    fn from(restriction: RestrictionType) -> Self {
        match restriction {
            RestrictionType::Regional => ReasonType::Regional,
            RestrictionType::Regulatory => ReasonType::Regulatory,
            RestrictionType::Carrier => ReasonType::Carrier,
            RestrictionType::HwVariant => ReasonType::HwVariant,
        }
    }
}

impl RestrictionType {
    /// Severity of a missing combo explained by this restriction
    pub fn base_severity(&self) -> Severity {
        match self {
            RestrictionType::Regional | RestrictionType::Regulatory | RestrictionType::Carrier => {
                Severity::Expected
            }
            RestrictionType::HwVariant => Severity::Low,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RestrictionType::Regional => "No action - regional restriction as designed",
            RestrictionType::Regulatory => "No action - regulatory compliance requirement",
            RestrictionType::Carrier => "Verify carrier requirements are current",
            RestrictionType::HwVariant => "Verify hardware variant matches build configuration",
        }
    }
}

// ============================================================================
// Reasoning result
// ============================================================================

/// Explanation attached to a discrepancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub has_explanation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_type: Option<ReasonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_citation: Option<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

impl ReasoningResult {
    fn explained(
        reason_type: ReasonType,
        explanation: impl Into<String>,
        severity: Severity,
        recommended_action: impl Into<String>,
    ) -> Self {
        Self {
            has_explanation: true,
            reason_type: Some(reason_type),
            explanation: Some(explanation.into()),
            source_citation: None,
            severity,
            recommended_action: Some(recommended_action.into()),
        }
    }

    fn citing(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !source.is_empty() {
            self.source_citation = Some(source);
        }
        self
    }

    fn unexplained(severity: Severity) -> Self {
        Self {
            has_explanation: false,
            reason_type: None,
            explanation: None,
            source_citation: None,
            severity,
            recommended_action: Some("Investigate - unexpected discrepancy".to_string()),
        }
    }
}

impl fmt::Display for ReasoningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.explanation, self.has_explanation) {
            (Some(explanation), true) => {
                write!(f, "[{}] {}", self.severity.as_str().to_uppercase(), explanation)
            }
            _ => f.write_str("[UNKNOWN] No explanation found"),
        }
    }
}

/// A critical or high discrepancy someone needs to act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub combo: String,
    pub severity: Severity,
    pub discrepancy_type: DiscrepancyType,
    pub action: String,
    pub explanation: Option<String>,
}

// ============================================================================
// Engine
// ============================================================================

/// Explains discrepancies against one knowledge-base context
#[derive(Debug, Clone, Default)]
pub struct ReasoningEngine {
    kb: KnowledgeBaseContext,
}

impl ReasoningEngine {
    pub fn new(kb: KnowledgeBaseContext) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBaseContext {
        &self.kb
    }

    /// Explain one discrepancy
    pub fn explain(&self, discrepancy: &Discrepancy) -> ReasoningResult {
        match discrepancy.discrepancy_type() {
            DiscrepancyType::PrunedByEfs => {
                return ReasoningResult::explained(
                    ReasonType::Efs,
                    "Combo disabled by EFS pruning configuration",
                    Severity::Expected,
                    "No action - intentionally pruned by EFS",
                )
                .citing(discrepancy.details().unwrap_or(PRUNE_CA_COMBOS));
            }
            DiscrepancyType::EnvelopeFiltered => {
                return ReasoningResult::explained(
                    ReasonType::Envelope,
                    "Combo filtered by RF envelope validation",
                    Severity::Expected,
                    "No action - RF envelope constraint",
                )
                .citing("RFPD envelope");
            }
            _ => {}
        }

        self.explain_by_band(discrepancy)
            .or_else(|| self.explain_by_combo(discrepancy))
            .or_else(|| self.explain_by_carrier(discrepancy))
            .unwrap_or_else(|| self.apply_heuristics(discrepancy))
    }

    fn explain_by_band(&self, discrepancy: &Discrepancy) -> Option<ReasoningResult> {
        discrepancy
            .combo()
            .canonical_components()
            .iter()
            .find_map(|component| {
                self.kb
                    .applicable_band_restrictions(component.band)
                    .next()
                    .map(|r| self.band_restriction_result(r, discrepancy))
            })
    }

    fn band_restriction_result(
        &self,
        restriction: &BandRestriction,
        discrepancy: &Discrepancy,
    ) -> ReasoningResult {
        let mut severity = restriction.restriction_type.base_severity();
        // Present when policy excludes it is more suspicious than absent
        if discrepancy.discrepancy_type() == DiscrepancyType::ExtraInRuntimeTable {
            severity = severity.escalate();
        }

        ReasoningResult::explained(
            restriction.restriction_type.into(),
            format!("Band {}: {}", restriction.band, restriction.reason),
            severity,
            restriction.restriction_type.recommendation(),
        )
        .citing(restriction.source_file.as_str())
    }

    fn explain_by_combo(&self, discrepancy: &Discrepancy) -> Option<ReasoningResult> {
        let key = discrepancy.combo().canonical_key();
        let restriction = self.kb.combo_restrictions(&key).first()?;
        let explanation = if restriction.reason.is_empty() {
            format!("Combo {} is restricted", key)
        } else {
            restriction.reason.clone()
        };

        Some(
            ReasoningResult::explained(
                restriction.restriction_type.into(),
                explanation,
                Severity::Expected,
                "No action - expected restriction",
            )
            .citing(restriction.source_file.as_str()),
        )
    }

    fn explain_by_carrier(&self, discrepancy: &Discrepancy) -> Option<ReasoningResult> {
        let carrier = self.kb.active_carrier()?;
        let requirement = self.kb.active_carrier_requirement()?;
        let key = discrepancy.combo().canonical_key();
        let citation = format!("{} carrier requirements", requirement.carrier_name);

        if requirement.excluded_combos.contains(&key) {
            let explanation = match requirement.notes.get(&key) {
                Some(note) if !note.is_empty() => format!("Excluded by {} policy: {}", carrier, note),
                _ => format!("Excluded by {} policy", carrier),
            };
            return Some(
                ReasoningResult::explained(
                    ReasonType::Carrier,
                    explanation,
                    Severity::Expected,
                    "No action - carrier exclusion",
                )
                .citing(citation),
            );
        }

        if discrepancy.discrepancy_type().is_missing() && requirement.required_combos.contains(&key) {
            let missing_from = match discrepancy.discrepancy_type() {
                DiscrepancyType::MissingInAdvertisedCapability => "UE capability",
                _ => "runtime table",
            };
            return Some(
                ReasoningResult::explained(
                    ReasonType::Carrier,
                    format!("Required by {} but missing in {}", carrier, missing_from),
                    Severity::Critical,
                    "Investigate - required combo is missing",
                )
                .citing(citation),
            );
        }

        None
    }

    fn apply_heuristics(&self, discrepancy: &Discrepancy) -> ReasoningResult {
        let combo = discrepancy.combo();
        let kind = discrepancy.discrepancy_type();

        if kind.is_missing() && combo.nr_components().any(|c| c.band >= MMWAVE_MIN_BAND) {
            return ReasoningResult::explained(
                ReasonType::Heuristic,
                "mmWave band combo - often regionally or HW restricted",
                Severity::Low,
                "Verify mmWave support for target market",
            );
        }

        let bands = combo.bands();

        if bands.contains(&FIRSTNET_BAND) {
            let severity = if self.kb.is_north_america() {
                Severity::Expected
            } else {
                Severity::Medium
            };
            return ReasoningResult::explained(
                ReasonType::Heuristic,
                "Band 14 (FirstNet) - US-only public-safety band",
                severity,
                "No action if the target market matches band 14 deployment",
            );
        }

        if bands.contains(&BAND_71) {
            return ReasoningResult::explained(
                ReasonType::Heuristic,
                "Band 71 - often carrier-specific",
                Severity::Low,
                "Verify carrier requirements",
            );
        }

        match kind {
            DiscrepancyType::BcsMismatch => ReasoningResult::explained(
                ReasonType::Heuristic,
                "BCS mismatch - may indicate version or configuration difference",
                Severity::Medium,
                "Review BCS configuration in RFC",
            ),
            DiscrepancyType::ExtraInRuntimeTable => ReasoningResult::explained(
                ReasonType::Heuristic,
                "Combo in runtime table but not RFC - may be dynamically added or from a different RFC version",
                Severity::Medium,
                "Verify RFC/build version match",
            ),
            _ => ReasoningResult::unexplained(kind.default_severity()),
        }
    }

    /// Attach a reason to every discrepancy that has none
    ///
    /// Already-explained discrepancies are left untouched, so running this
    /// twice gives the same result as running it once.
    pub fn enrich(&self, discrepancies: &mut [Discrepancy]) {
        let mut explained = 0;
        for discrepancy in discrepancies.iter_mut().filter(|d| d.reason().is_none()) {
            let reason = self.explain(discrepancy);
            if reason.has_explanation {
                explained += 1;
            }
            discrepancy.set_reason(reason);
        }
        debug!(
            "Reasoning: {} of {} discrepancies explained in this pass",
            explained,
            discrepancies.len()
        );
    }
}

/// Group discrepancies by severity
pub fn categorize_by_severity(discrepancies: &[Discrepancy]) -> BTreeMap<Severity, Vec<&Discrepancy>> {
    let mut groups: BTreeMap<Severity, Vec<&Discrepancy>> = BTreeMap::new();
    for discrepancy in discrepancies {
        groups.entry(discrepancy.severity()).or_default().push(discrepancy);
    }
    groups
}

/// Critical and high discrepancies, critical first
pub fn action_items(discrepancies: &[Discrepancy]) -> Vec<ActionItem> {
    let mut items: Vec<ActionItem> = discrepancies
        .iter()
        .filter(|d| d.severity().is_actionable())
        .map(|d| ActionItem {
            combo: d.combo().canonical_key(),
            severity: d.severity(),
            discrepancy_type: d.discrepancy_type(),
            action: d
                .reason()
                .and_then(|r| r.recommended_action.clone())
                .unwrap_or_else(|| "Investigate".to_string()),
            explanation: d.reason().and_then(|r| r.explanation.clone()),
        })
        .collect();

    // Stable: keeps discrepancy order within a severity
    items.sort_by_key(|item| std::cmp::Reverse(item.severity));
    items
}
