use std::path::PathBuf;

/// Identifier of a simulated mote.
pub type MoteId = u32;

/// Common error type for the parsing core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no platform tags supplied")]
    NoPlatforms,
    #[error("{0} incomplete power record group(s)")]
    IncompleteGroups(usize),
    #[error("simulation config: {0}")]
    SimulationConfig(String),
    #[error("packet decoder failed: {0}")]
    Decoder(String),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Reads a whole input file, tagging failures with the path.
pub fn read_text(path: impl AsRef<std::path::Path>) -> CoreResult<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| CoreError::io(path, source))
}
