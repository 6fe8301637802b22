use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::log::LogManager;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Fields extracted from each captured 802.15.4 frame.
pub const DEFAULT_FIELDS: [&str; 9] = [
    "frame.time",
    "frame.len",
    "wpan.src64",
    "wpan.dst64",
    "icmpv6.type",
    "ipv6.src",
    "ipv6.dst",
    "icmpv6.code",
    "data.data",
];

/// Turns a packet capture into comma-delimited rows with a header line.
pub trait PacketDecoder {
    fn decode(&self, capture: &Path) -> CoreResult<String>;
}

/// Decoder backed by the `tshark` command-line tool.
pub struct TsharkDecoder {
    program: PathBuf,
    fields: Vec<String>,
    logger: LogManager,
}

impl TsharkDecoder {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("tshark"),
            fields: DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect(),
            logger: LogManager::new("capture"),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn arguments(&self, capture: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-T", "fields", "-E", "header=y", "-E", "separator=,"]
            .iter()
            .map(OsString::from)
            .collect();
        for field in &self.fields {
            args.push("-e".into());
            args.push(field.into());
        }
        args.push("-r".into());
        args.push(capture.as_os_str().to_owned());
        args
    }
}

impl Default for TsharkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder for TsharkDecoder {
    fn decode(&self, capture: &Path) -> CoreResult<String> {
        std::fs::metadata(capture).map_err(|source| CoreError::io(capture, source))?;

        let output = Command::new(&self.program)
            .args(self.arguments(capture))
            .output()
            .map_err(|err| {
                CoreError::Decoder(format!("spawning {}: {}", self.program.display(), err))
            })?;
        if !output.status.success() {
            return Err(CoreError::Decoder(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|err| CoreError::Decoder(format!("non UTF-8 output: {}", err)))?;
        self.logger
            .record(&format!("decoded {} ({} bytes)", capture.display(), text.len()));
        Ok(text)
    }
}

/// Decoded packet rows, one string per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PacketTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PacketTable {
    pub fn from_delimited(text: &str) -> CoreResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let header = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(String::from).collect());
        }
        Ok(Self { header, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|field| field == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    struct CannedDecoder(&'static str);

    impl PacketDecoder for CannedDecoder {
        fn decode(&self, _capture: &Path) -> CoreResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn arguments_request_every_field() {
        let args = TsharkDecoder::new().arguments(Path::new("data/output.pcap"));
        assert_eq!(args.len(), 6 + 2 * DEFAULT_FIELDS.len() + 2);
        assert_eq!(args[7], OsString::from("frame.time"));
        assert_eq!(args.last(), Some(&OsString::from("data/output.pcap")));
    }

    #[test]
    fn decoded_rows_parse_into_a_table() {
        let decoder = CannedDecoder("frame.time,frame.len\n\"Jan 1, 1970\",42\nx,7\n");
        let text = decoder.decode(Path::new("ignored.pcap")).unwrap();
        let table = PacketTable::from_delimited(&text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("frame.len"), Some(1));
        assert_eq!(table.rows[0][0], "Jan 1, 1970");
    }

    #[test]
    fn missing_capture_is_an_io_error() {
        let result = TsharkDecoder::new().decode(Path::new("/nonexistent/output.pcap"));
        assert!(matches!(result, Err(CoreError::Io { .. })));
    }

    #[test]
    fn missing_program_is_a_decoder_error() {
        let capture = NamedTempFile::new().unwrap();
        let result = TsharkDecoder::new()
            .with_program("/nonexistent/tshark")
            .decode(capture.path());
        assert!(matches!(result, Err(CoreError::Decoder(_))));
    }
}
