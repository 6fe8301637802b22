use crate::powertracker::category::PowerEventCategory;
use crate::powertracker::record::PowerRecord;
use crate::powertracker::scanner::{FieldMatch, FieldPatternScanner};
use crate::prelude::{CoreError, CoreResult, MoteId};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const CATEGORY_COUNT: usize = PowerEventCategory::ALL.len();

/// How per-category matches are merged into records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Group matches by mote and per-mote cycle number.
    #[default]
    Keyed,
    /// Zip the i-th match of every category, truncating to the shortest.
    Lockstep,
}

/// What to do with keyed groups that lack a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompletePolicy {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteGroup {
    pub mote_id: MoteId,
    pub cycle: usize,
    pub missing: Vec<PowerEventCategory>,
}

/// A lockstep step whose categories disagree on the mote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub step: usize,
    pub mote_ids: Vec<MoteId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub records: usize,
    /// Match count per category, in declaration order.
    pub matches: [usize; CATEGORY_COUNT],
    pub incomplete: Vec<IncompleteGroup>,
    pub divergences: Vec<Divergence>,
}

impl AssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.incomplete.is_empty() && self.divergences.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub records: Vec<PowerRecord>,
    pub report: AssemblyReport,
}

struct Group {
    mote_id: MoteId,
    cycle: usize,
    slots: [Option<f64>; CATEGORY_COUNT],
}

/// Merges the five per-category scans of a PowerTracker log into records.
pub struct SynchronizedRecordAssembler {
    scanners: Vec<FieldPatternScanner>,
    strategy: SyncStrategy,
    policy: IncompletePolicy,
    logger: LogManager,
}

impl SynchronizedRecordAssembler {
    pub fn new<S: AsRef<str>>(platforms: &[S]) -> CoreResult<Self> {
        let scanners = PowerEventCategory::ALL
            .iter()
            .map(|category| FieldPatternScanner::new(platforms, *category))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self {
            scanners,
            strategy: SyncStrategy::default(),
            policy: IncompletePolicy::default(),
            logger: LogManager::new("powertracker"),
        })
    }

    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_policy(mut self, policy: IncompletePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn assemble(&self, text: &str) -> CoreResult<Assembly> {
        let assembly = match self.strategy {
            SyncStrategy::Keyed => self.keyed(text),
            SyncStrategy::Lockstep => self.lockstep(text),
        };

        let report = &assembly.report;
        if !report.incomplete.is_empty() {
            for group in &report.incomplete {
                self.logger.warn(&format!(
                    "mote {} cycle {} lacks {:?}",
                    group.mote_id, group.cycle, group.missing
                ));
            }
            if self.policy == IncompletePolicy::Fail {
                return Err(CoreError::IncompleteGroups(report.incomplete.len()));
            }
        }
        self.logger.record(&format!(
            "assembled {} power records ({:?})",
            report.records, self.strategy
        ));
        Ok(assembly)
    }

    fn keyed(&self, text: &str) -> Assembly {
        let mut report = AssemblyReport::default();
        let mut lines: Vec<(PowerEventCategory, FieldMatch)> = Vec::new();
        for scanner in &self.scanners {
            let category = scanner.category();
            lines.extend(scanner.scan(text).map(|found| (category, found)));
        }
        lines.sort_by_key(|(_, found)| found.offset);

        // A MONITORED line opens a new cycle for its mote; the other
        // categories fill the cycle currently open for that mote.
        let mut groups: Vec<Group> = Vec::new();
        let mut open: HashMap<MoteId, usize> = HashMap::new();
        let mut next_cycle: HashMap<MoteId, usize> = HashMap::new();
        for (category, found) in lines {
            let slot = category.index();
            report.matches[slot] += 1;

            let current = open.get(&found.mote_id).copied().filter(|&index| {
                category != PowerEventCategory::Monitored && groups[index].slots[slot].is_none()
            });
            let index = match current {
                Some(index) => index,
                None => {
                    let counter = next_cycle.entry(found.mote_id).or_insert(0);
                    groups.push(Group {
                        mote_id: found.mote_id,
                        cycle: *counter,
                        slots: [None; CATEGORY_COUNT],
                    });
                    *counter += 1;
                    open.insert(found.mote_id, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[index].slots[slot] = Some(found.seconds());
        }

        let mut records = Vec::with_capacity(groups.len());
        for group in groups {
            let mut times = [0.0; CATEGORY_COUNT];
            let mut missing = Vec::new();
            for category in PowerEventCategory::ALL {
                match group.slots[category.index()] {
                    Some(seconds) => times[category.index()] = seconds,
                    None => missing.push(category),
                }
            }
            if missing.is_empty() {
                records.push(PowerRecord::from_times(group.mote_id, times));
            } else {
                report.incomplete.push(IncompleteGroup {
                    mote_id: group.mote_id,
                    cycle: group.cycle,
                    missing,
                });
            }
        }

        report.records = records.len();
        Assembly { records, report }
    }

    fn lockstep(&self, text: &str) -> Assembly {
        let mut report = AssemblyReport::default();
        for scanner in &self.scanners {
            report.matches[scanner.category().index()] = scanner.scan(text).count();
        }

        let mut streams: Vec<_> = self.scanners.iter().map(|s| s.scan(text)).collect();
        let mut records = Vec::new();
        'steps: loop {
            let mut step: Vec<FieldMatch> = Vec::with_capacity(CATEGORY_COUNT);
            for stream in streams.iter_mut() {
                match stream.next() {
                    Some(found) => step.push(found),
                    None => break 'steps,
                }
            }

            // The last category supplies the mote id, as every category
            // overwrites it in turn.
            let mote_id = step[CATEGORY_COUNT - 1].mote_id;
            if step.iter().any(|found| found.mote_id != mote_id) {
                let divergence = Divergence {
                    step: records.len(),
                    mote_ids: step.iter().map(|found| found.mote_id).collect(),
                };
                self.logger.warn(&format!(
                    "step {} mixes motes {:?}",
                    divergence.step, divergence.mote_ids
                ));
                report.divergences.push(divergence);
            }

            let mut times = [0.0; CATEGORY_COUNT];
            for (slot, found) in step.iter().enumerate() {
                times[slot] = found.seconds();
            }
            records.push(PowerRecord::from_times(mote_id, times));
        }

        let shortest = report.matches.iter().copied().min().unwrap_or(0);
        if report.matches.iter().any(|&count| count != shortest) {
            self.logger.warn(&format!(
                "category counts {:?} differ, truncated to {}",
                report.matches, shortest
            ));
        }

        report.records = records.len();
        Assembly { records, report }
    }
}
