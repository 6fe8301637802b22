use crate::prelude::{read_text, CoreError, CoreResult, MoteId};
use crate::telemetry::log::LogManager;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Planar position of a mote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Screen-space position: the simulator's y axis points down.
    pub fn flipped(self) -> Self {
        Self {
            x: self.x,
            y: -self.y,
        }
    }
}

/// Mote positions ordered by id.
pub type MotePositions = BTreeMap<MoteId, Position>;

/// Anything that can tell where the motes of a simulation are.
pub trait PositionSource {
    fn positions_by_mote_id(&self, config_path: &Path) -> CoreResult<MotePositions>;
}

/// Reads mote ids and positions out of a Cooja `.csc` simulation file.
pub struct CscPositionSource {
    mote_block: Regex,
    id: Regex,
    x: Regex,
    y: Regex,
    logger: LogManager,
}

impl CscPositionSource {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            mote_block: Regex::new(r"(?s)<mote>(.*?)</mote>")?,
            id: Regex::new(r"<id>\s*(\d+)\s*</id>")?,
            x: Regex::new(r"<x>\s*([^<\s]+)\s*</x>")?,
            y: Regex::new(r"<y>\s*([^<\s]+)\s*</y>")?,
            logger: LogManager::new("positions"),
        })
    }

    pub fn parse(&self, document: &str) -> CoreResult<MotePositions> {
        let mut positions = MotePositions::new();
        for (index, block) in self.mote_block.captures_iter(document).enumerate() {
            let body = block.get(1).map(|m| m.as_str()).unwrap_or_default();
            let id = Self::field::<MoteId>(&self.id, body);
            let x = Self::field::<f64>(&self.x, body);
            let y = Self::field::<f64>(&self.y, body);
            match (id, x, y) {
                (Some(id), Some(x), Some(y)) => {
                    if positions.insert(id, Position::new(x, y)).is_some() {
                        self.logger
                            .warn(&format!("mote {} declared twice, keeping the last", id));
                    }
                }
                _ => self
                    .logger
                    .warn(&format!("mote block {} has no usable id or position", index)),
            }
        }

        if positions.is_empty() {
            return Err(CoreError::SimulationConfig(
                "no mote with an id and a position".into(),
            ));
        }
        Ok(positions)
    }

    fn field<T: std::str::FromStr>(pattern: &Regex, body: &str) -> Option<T> {
        pattern.captures(body)?.get(1)?.as_str().parse().ok()
    }
}

impl PositionSource for CscPositionSource {
    fn positions_by_mote_id(&self, config_path: &Path) -> CoreResult<MotePositions> {
        let document = read_text(config_path)?;
        self.parse(&document)
    }
}
