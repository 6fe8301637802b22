use crate::workflow::runner::WorkflowResult;
use motecore::powertracker::{AssemblyReport, PowerRecord};
use motecore::topology::TopologyGraph;
use serde::Serialize;

/// Snapshot handed to the external renderer.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RenderModel {
    pub graph: TopologyGraph,
    pub records: Vec<PowerRecord>,
    pub report: AssemblyReport,
}

impl From<&WorkflowResult> for RenderModel {
    fn from(result: &WorkflowResult) -> Self {
        Self {
            graph: result.graph.clone(),
            records: result.records.clone(),
            report: result.report.clone(),
        }
    }
}
