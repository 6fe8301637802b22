use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use motecore::capture::{PacketDecoder, PacketTable};
use motecore::powertracker::{write_records_to_path, AssemblyReport, PowerRecord};
use motecore::prelude::read_text;
use motecore::topology::{
    CscPositionSource, PositionSource, RelationshipHistory, TopologyEdgeExtractor, TopologyGraph,
    TopologyGraphBuilder,
};
use std::fs;
use std::path::{Path, PathBuf};

/// File layout of one experiment directory.
#[derive(Debug, Clone)]
pub struct ExperimentLayout {
    root: PathBuf,
}

impl ExperimentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn simulation(&self) -> PathBuf {
        self.root.join("simulation.csc")
    }

    pub fn data(&self, name: &str) -> PathBuf {
        self.root.join("data").join(name)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn result(&self, name: &str) -> PathBuf {
        self.results_dir().join(name)
    }
}

pub struct WorkflowResult {
    pub records: Vec<PowerRecord>,
    pub report: AssemblyReport,
    pub history: RelationshipHistory,
    pub graph: TopologyGraph,
    pub packets: Option<PacketTable>,
    pub outputs: Vec<PathBuf>,
}

/// Runs the parsing chain over one experiment directory.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, experiment: &Path) -> anyhow::Result<WorkflowResult> {
        let positions = CscPositionSource::new().context("building position reader")?;
        let decoder = self.config.decoder();
        self.execute_with(experiment, &positions, &decoder)
    }

    /// Every input is read and parsed before the first output is written.
    pub fn execute_with(
        &self,
        experiment: &Path,
        position_source: &dyn PositionSource,
        decoder: &dyn PacketDecoder,
    ) -> anyhow::Result<WorkflowResult> {
        let layout = ExperimentLayout::new(experiment);
        let adversarial = self.config.is_adversarial(layout.root());

        let decoded = if self.config.decode_capture {
            let capture = layout.data("output.pcap");
            let text = decoder
                .decode(&capture)
                .with_context(|| format!("decoding {}", capture.display()))?;
            let table = PacketTable::from_delimited(&text).context("parsing decoded packets")?;
            Some((text, table))
        } else {
            None
        };

        let power_log = read_text(layout.data("powertracker.log")).context("reading power log")?;
        let relationship_log =
            read_text(layout.data("relationships.log")).context("reading relationship log")?;
        let positions = position_source
            .positions_by_mote_id(&layout.simulation())
            .context("reading mote positions")?;

        let assembly = self
            .config
            .assembler()
            .context("building power record assembler")?
            .assemble(&power_log)
            .context("assembling power records")?;
        let history = TopologyEdgeExtractor::new()
            .context("building relationship extractor")?
            .extract(&relationship_log);
        let graph = TopologyGraphBuilder::new(adversarial).build(&positions, &history.latest_active());

        let results = layout.results_dir();
        fs::create_dir_all(&results)
            .with_context(|| format!("creating {}", results.display()))?;
        let mut outputs = Vec::new();

        let packets = match decoded {
            Some((text, table)) => {
                let path = layout.result("pcap.csv");
                fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
                outputs.push(path);
                Some(table)
            }
            None => None,
        };

        let power_path = layout.result("powertracker.csv");
        write_records_to_path(&power_path, &assembly.records)
            .with_context(|| format!("writing {}", power_path.display()))?;
        outputs.push(power_path);

        let json_path = layout.result("dodag.json");
        let json = graph.to_json().context("serializing DODAG")?;
        fs::write(&json_path, json).with_context(|| format!("writing {}", json_path.display()))?;
        outputs.push(json_path);

        let dot_path = layout.result("dodag.dot");
        fs::write(&dot_path, graph.to_dot())
            .with_context(|| format!("writing {}", dot_path.display()))?;
        outputs.push(dot_path);

        Ok(WorkflowResult {
            records: assembly.records,
            report: assembly.report,
            history,
            graph,
            packets,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{ExperimentProfile, SyntheticExperiment};
    use motecore::capture::TsharkDecoder;
    use motecore::powertracker::{IncompletePolicy, PowerEventCategory, SyncStrategy};
    use motecore::topology::RoleColor;
    use motecore::CoreResult;
    use tempfile::tempdir;

    struct CannedDecoder;

    impl PacketDecoder for CannedDecoder {
        fn decode(&self, _capture: &Path) -> CoreResult<String> {
            Ok("frame.time,frame.len\nt0,40\nt1,52\n".into())
        }
    }

    fn synthesize(root: &Path, name: &str, profile: &ExperimentProfile) -> (PathBuf, SyntheticExperiment) {
        let experiment = root.join(name);
        let synthetic = SyntheticExperiment::generate(profile).unwrap();
        synthetic.write_to(&experiment).unwrap();
        (experiment, synthetic)
    }

    #[test]
    fn runner_executes_parsing_chain() {
        let root = tempdir().unwrap();
        let profile = ExperimentProfile {
            motes: 5,
            cycles: 4,
            seed: 3,
            ..Default::default()
        };
        let (experiment, synthetic) = synthesize(root.path(), "without-malicious", &profile);

        let runner = Runner::new(WorkflowConfig::default());
        let result = runner.execute(&experiment).unwrap();

        assert_eq!(result.records.len(), 5 * 4);
        assert!(result.report.is_clean());
        assert_eq!(result.records[0].monitored_time, 60.0);
        assert_eq!(result.history.latest_active(), synthetic.parents);
        assert_eq!(result.graph.nodes.len(), 5);
        assert!(!result.graph.colors().contains(&RoleColor::Suspect));
        assert!(result.packets.is_none());
        assert_eq!(result.outputs.len(), 3);

        let csv = fs::read_to_string(experiment.join("results/powertracker.csv")).unwrap();
        let order = motecore::powertracker::sink::read_category_order(csv.as_bytes()).unwrap();
        assert_eq!(order, PowerEventCategory::ALL.to_vec());
        assert_eq!(csv.lines().count(), 1 + 5 * 4);
        assert!(experiment.join("results/dodag.dot").exists());
    }

    #[test]
    fn malicious_directory_marks_highest_mote() {
        let root = tempdir().unwrap();
        let profile = ExperimentProfile {
            motes: 4,
            ..Default::default()
        };
        let (experiment, _) = synthesize(root.path(), "with-malicious", &profile);

        let result = Runner::new(WorkflowConfig::default())
            .execute(&experiment)
            .unwrap();
        assert!(result.graph.adversarial);
        assert_eq!(
            result.graph.colors(),
            vec![
                RoleColor::Root,
                RoleColor::Normal,
                RoleColor::Normal,
                RoleColor::Suspect
            ]
        );
    }

    #[test]
    fn missing_input_writes_nothing() {
        let root = tempdir().unwrap();
        let (experiment, _) = synthesize(root.path(), "exp", &ExperimentProfile::default());
        fs::remove_file(experiment.join("data/relationships.log")).unwrap();

        let result = Runner::new(WorkflowConfig::default()).execute(&experiment);
        assert!(result.is_err());
        assert!(!experiment.join("results").exists());
    }

    #[test]
    fn strict_policy_fails_on_truncated_log() {
        let root = tempdir().unwrap();
        let (experiment, _) = synthesize(root.path(), "exp", &ExperimentProfile::default());
        let log_path = experiment.join("data/powertracker.log");
        let mut log = fs::read_to_string(&log_path).unwrap();
        log.push_str("Sky_1 MONITORED 1\n");
        fs::write(&log_path, log).unwrap();

        let lenient = Runner::new(WorkflowConfig::default())
            .execute(&experiment)
            .unwrap();
        assert_eq!(lenient.report.incomplete.len(), 1);

        let config = WorkflowConfig {
            incomplete: IncompletePolicy::Fail,
            sync: SyncStrategy::Keyed,
            ..Default::default()
        };
        assert!(Runner::new(config).execute(&experiment).is_err());
    }

    #[test]
    fn decoded_capture_is_written_alongside() {
        let root = tempdir().unwrap();
        let (experiment, _) = synthesize(root.path(), "exp", &ExperimentProfile::default());
        let config = WorkflowConfig {
            decode_capture: true,
            ..Default::default()
        };
        let positions = CscPositionSource::new().unwrap();

        let result = Runner::new(config)
            .execute_with(&experiment, &positions, &CannedDecoder)
            .unwrap();
        assert_eq!(result.packets.map(|table| table.len()), Some(2));
        assert!(experiment.join("results/pcap.csv").exists());
    }

    #[test]
    fn missing_capture_fails_before_outputs() {
        let root = tempdir().unwrap();
        let (experiment, _) = synthesize(root.path(), "exp", &ExperimentProfile::default());
        let config = WorkflowConfig {
            decode_capture: true,
            ..Default::default()
        };
        let positions = CscPositionSource::new().unwrap();

        let result = Runner::new(config).execute_with(&experiment, &positions, &TsharkDecoder::new());
        assert!(result.is_err());
        assert!(!experiment.join("results").exists());
    }
}
