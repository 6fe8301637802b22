use anyhow::Context;
use motecore::capture::{TsharkDecoder, DEFAULT_FIELDS};
use motecore::powertracker::{IncompletePolicy, SyncStrategy, SynchronizedRecordAssembler};
use motecore::CoreResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Directory name that marks an experiment with an attacker mote.
pub const DEFAULT_MALICIOUS_MARKER: &str = "with-malicious";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Platform tags accepted in PowerTracker lines.
    pub platforms: Vec<String>,
    pub malicious_marker: String,
    pub sync: SyncStrategy,
    pub incomplete: IncompletePolicy,
    /// Run the packet capture through tshark.
    pub decode_capture: bool,
    pub tshark: PathBuf,
    pub capture_fields: Vec<String>,
    /// Address of the render bridge.
    pub bind: SocketAddr,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            platforms: ["Sky", "Z1", "Wismote", "Cooja"]
                .iter()
                .map(|platform| platform.to_string())
                .collect(),
            malicious_marker: DEFAULT_MALICIOUS_MARKER.into(),
            sync: SyncStrategy::Keyed,
            incomplete: IncompletePolicy::Warn,
            decode_capture: false,
            tshark: PathBuf::from("tshark"),
            capture_fields: DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect(),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(platforms: Vec<String>, sync: SyncStrategy, decode_capture: bool) -> Self {
        let mut config = Self {
            sync,
            decode_capture,
            ..Default::default()
        };
        if !platforms.is_empty() {
            config.platforms = platforms;
        }
        config
    }

    /// True when the experiment directory carries the malicious marker name.
    pub fn is_adversarial(&self, experiment: &Path) -> bool {
        let resolved = experiment
            .canonicalize()
            .unwrap_or_else(|_| experiment.to_path_buf());
        resolved
            .file_name()
            .map(|name| name == self.malicious_marker.as_str())
            .unwrap_or(false)
    }

    pub fn assembler(&self) -> CoreResult<SynchronizedRecordAssembler> {
        Ok(SynchronizedRecordAssembler::new(self.platforms.as_slice())?
            .with_strategy(self.sync)
            .with_policy(self.incomplete))
    }

    pub fn decoder(&self) -> TsharkDecoder {
        TsharkDecoder::new()
            .with_program(self.tshark.clone())
            .with_fields(self.capture_fields.iter().cloned())
    }
}
