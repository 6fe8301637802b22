use crate::prelude::{CoreResult, MoteId};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::ScanMetrics;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Child → parent mapping of the final routing snapshot.
pub type ParentMap = BTreeMap<MoteId, MoteId>;

const RELATIONSHIP_PATTERN: &str = r"^(\d+)\s+ID:(\d+)\s+#L\s+(\d+)\s+(\d+)$";

/// One `#L` line of the relationship log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEvent {
    /// Position among the matching lines.
    pub sequence: usize,
    /// Simulation time the line was logged at; `None` when it does not fit
    /// in 64 bits.
    pub timestamp: Option<u64>,
    pub mote_id: MoteId,
    pub parent_id: MoteId,
    /// False when the flag was zero, i.e. the link was dropped.
    pub active: bool,
}

/// Append-only record of every parent announcement in a relationship log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipHistory {
    events: Vec<RelationshipEvent>,
}

impl RelationshipHistory {
    pub fn events(&self) -> &[RelationshipEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_for(&self, mote_id: MoteId) -> impl Iterator<Item = &RelationshipEvent> {
        self.events
            .iter()
            .filter(move |event| event.mote_id == mote_id)
    }

    /// Final topology: the latest event of each mote decides, and an
    /// inactive latest event leaves the mote without a parent.
    pub fn latest_active(&self) -> ParentMap {
        self.snapshot(|_| true)
    }

    /// Topology as it stood at `timestamp`, using only events logged at or
    /// before it. Events without a usable timestamp are left out.
    pub fn at(&self, timestamp: u64) -> ParentMap {
        self.snapshot(|event| event.timestamp.is_some_and(|logged| logged <= timestamp))
    }

    fn snapshot(&self, include: impl Fn(&RelationshipEvent) -> bool) -> ParentMap {
        let mut latest: BTreeMap<MoteId, &RelationshipEvent> = BTreeMap::new();
        for event in self.events.iter().filter(|event| include(*event)) {
            latest.insert(event.mote_id, event);
        }
        latest
            .into_iter()
            .filter(|(_, event)| event.active)
            .map(|(mote_id, event)| (mote_id, event.parent_id))
            .collect()
    }
}

/// Reads RPL parent announcements (`<time> ID:<mote> #L <parent> <flag>`).
pub struct TopologyEdgeExtractor {
    pattern: Regex,
    logger: LogManager,
    metrics: ScanMetrics,
}

impl TopologyEdgeExtractor {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            pattern: Regex::new(RELATIONSHIP_PATTERN)?,
            logger: LogManager::new("relationships"),
            metrics: ScanMetrics::new(),
        })
    }

    /// Counters cover the latest call only.
    pub fn extract(&self, text: &str) -> RelationshipHistory {
        self.metrics.reset();
        let mut history = RelationshipHistory::default();
        for line in text.lines() {
            match self.parse_line(line, history.events.len()) {
                Some(event) => {
                    self.metrics.record_matched();
                    history.events.push(event);
                }
                None => {
                    self.metrics.record_skipped();
                    self.logger.skip(line, "not a parent announcement");
                }
            }
        }

        let counters = self.metrics.snapshot();
        self.logger.record(&format!(
            "{} relationship events, {} lines skipped",
            counters.matched, counters.skipped
        ));
        history
    }

    /// Shorthand for the final child → parent snapshot.
    pub fn current_parents(&self, text: &str) -> ParentMap {
        self.extract(text).latest_active()
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    fn parse_line(&self, line: &str, sequence: usize) -> Option<RelationshipEvent> {
        let captures = self.pattern.captures(line)?;
        let flag: u64 = captures[4].parse().ok()?;
        Some(RelationshipEvent {
            sequence,
            timestamp: captures[1].parse().ok(),
            mote_id: captures[2].parse().ok()?,
            parent_id: captures[3].parse().ok()?,
            active: flag != 0,
        })
    }
}
