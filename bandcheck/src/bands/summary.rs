//! Per-RAT trace summary counts

use super::{BandTraceResult, FinalStatus, Rat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final-status counts for one RAT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub total: usize,
    pub enabled: usize,
    pub filtered: usize,
    pub anomalies: usize,
    pub not_supported: usize,
    pub missing_in_device_log: usize,
    pub missing_in_network: usize,
}

impl TraceSummary {
    pub fn from_results(results: &[BandTraceResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.final_status() {
                FinalStatus::Enabled => summary.enabled += 1,
                FinalStatus::Filtered => summary.filtered += 1,
                FinalStatus::Anomaly => summary.anomalies += 1,
                FinalStatus::NotSupportedByHardware => summary.not_supported += 1,
                FinalStatus::MissingInDeviceLog => summary.missing_in_device_log += 1,
                FinalStatus::MissingInNetworkCapability => summary.missing_in_network += 1,
            }
        }
        summary
    }
}

/// Summarize every RAT of a `trace_all` result
pub fn summarize(results: &BTreeMap<Rat, Vec<BandTraceResult>>) -> BTreeMap<Rat, TraceSummary> {
    results
        .iter()
        .map(|(rat, list)| (*rat, TraceSummary::from_results(list)))
        .collect()
}
