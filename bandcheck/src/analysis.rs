//! One-shot analysis run
//!
//! Wires the input document through the engines the registry marks active:
//! band tracing, then combo comparison → EFS reconciliation → reasoning.
//! Produces one serializable [`AnalysisReport`].

use crate::bands::summary::summarize;
use crate::bands::{BandTraceResult, DocumentStatus, Rat, Stage, TraceSummary};
use crate::combos::{
    compare_built_vs_advertised, compare_defined_vs_built, summary_stats, ComboSummary, ComboType,
    ComparisonResult, Discrepancy,
};
use crate::error::Result;
use crate::input::{AnalysisInput, BandInput, ComboInput};
use crate::knowledge::reasoning::{action_items, categorize_by_severity};
use crate::knowledge::{ActionItem, KnowledgeBaseContext, ReasoningEngine, Severity};
use crate::registry::{Engine, ModuleInfo, ModuleRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Band tracing section of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandReport {
    pub traces: BTreeMap<Rat, Vec<BandTraceResult>>,
    pub summary: BTreeMap<Rat, TraceSummary>,
    pub document_status: BTreeMap<Stage, DocumentStatus>,
}

/// Combo verification section of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboReport {
    pub defined_vs_built: BTreeMap<ComboType, ComparisonResult>,
    pub built_vs_advertised: BTreeMap<ComboType, ComparisonResult>,
    /// Enriched discrepancies, defined-vs-built first
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ComboSummary,
    pub severity_counts: BTreeMap<Severity, usize>,
    pub action_items: Vec<ActionItem>,
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub active_region: Option<String>,
    pub active_carrier: Option<String>,
    pub modules: Vec<ModuleInfo>,
    pub bands: Option<BandReport>,
    pub combos: Option<ComboReport>,
}

/// Configured analysis run: input plus knowledge base
pub struct AnalysisRun {
    input: AnalysisInput,
    engine: ReasoningEngine,
}

impl AnalysisRun {
    /// Validate the input and prepare a run
    pub fn new(input: AnalysisInput, kb: KnowledgeBaseContext) -> Result<Self> {
        input.validate()?;
        Ok(Self {
            input,
            engine: ReasoningEngine::new(kb),
        })
    }

    /// Execute every active engine that has input
    pub fn execute(&self, registry: &ModuleRegistry) -> Result<AnalysisReport> {
        let run_id = Uuid::new_v4();
        info!("Starting analysis run {}", run_id);

        let enabled = |engine: Engine| registry.active().any(|m| m.engine() == Some(engine));

        let bands = match self.input.bands.as_ref().filter(|b| !b.is_empty()) {
            Some(input) if enabled(Engine::BandTrace) => Some(trace_bands(input)),
            Some(_) => {
                warn!("Band input supplied but band tracing is not active, skipping");
                None
            }
            None => None,
        };

        let combos = match self.input.combos.as_ref().filter(|c| !c.is_empty()) {
            Some(input) if enabled(Engine::ComboVerification) => Some(self.verify_combos(input)?),
            Some(_) => {
                warn!("Combo input supplied but combo verification is not active, skipping");
                None
            }
            None => None,
        };

        let kb = self.engine.knowledge_base();
        let report = AnalysisReport {
            run_id,
            generated_at: bandcheck_common::time::now(),
            tool_version: tool_version(),
            active_region: kb.active_region().map(str::to_string),
            active_carrier: kb.active_carrier().map(str::to_string),
            modules: registry.list().to_vec(),
            bands,
            combos,
        };

        info!(
            "Analysis run {} complete: {} bands traced, {} combo discrepancies",
            run_id,
            report
                .bands
                .as_ref()
                .map_or(0usize, |b| b.traces.values().map(Vec::len).sum()),
            report.combos.as_ref().map_or(0usize, |c| c.discrepancies.len())
        );
        Ok(report)
    }

    fn verify_combos(&self, input: &ComboInput) -> Result<ComboReport> {
        let defined = input.defined_collection()?;
        let built = input.built_collection()?;
        let advertised = input.advertised_collection()?;

        let defined_vs_built = compare_defined_vs_built(&defined, &built);
        let built_vs_advertised = compare_built_vs_advertised(&built, &advertised);
        let summary = summary_stats(
            &defined,
            &built,
            &advertised,
            &defined_vs_built,
            &built_vs_advertised,
        );

        let mut discrepancies: Vec<Discrepancy> = defined_vs_built
            .discrepancies
            .iter()
            .chain(&built_vs_advertised.discrepancies)
            .cloned()
            .collect();

        if let Some(efs) = &self.input.efs {
            discrepancies = efs.reconcile(discrepancies);
        }
        self.engine.enrich(&mut discrepancies);

        let severity_counts = categorize_by_severity(&discrepancies)
            .into_iter()
            .map(|(severity, list)| (severity, list.len()))
            .collect();
        let action_items = action_items(&discrepancies);

        Ok(ComboReport {
            defined_vs_built: defined_vs_built.results,
            built_vs_advertised: built_vs_advertised.results,
            discrepancies,
            summary,
            severity_counts,
            action_items,
        })
    }
}

fn trace_bands(input: &BandInput) -> BandReport {
    let tracer = input.tracer();
    let traces = tracer.trace_all();
    BandReport {
        summary: summarize(&traces),
        document_status: tracer.document_status().clone(),
        traces,
    }
}

/// Version string stamped by the build script
pub fn tool_version() -> String {
    format!(
        "{} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    )
}
