use anyhow::Context;
use motecore::powertracker::PowerEventCategory;
use motecore::topology::{MotePositions, ParentMap, Position};
use motecore::MoteId;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Shape of a synthetic Cooja experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentProfile {
    /// Mote count, root included.
    pub motes: u32,
    pub cycles: u32,
    pub period_us: u64,
    pub area_m: f64,
    /// Chance that a mote switches parent once after joining.
    pub switch_probability: f64,
    pub seed: u64,
    pub platform: String,
}

impl Default for ExperimentProfile {
    fn default() -> Self {
        Self {
            motes: 8,
            cycles: 5,
            period_us: 60_000_000,
            area_m: 100.0,
            switch_probability: 0.3,
            seed: 0,
            platform: "Sky".into(),
        }
    }
}

impl ExperimentProfile {
    fn normalized_motes(&self) -> u32 {
        self.motes.max(1)
    }

    fn normalized_area(&self) -> f64 {
        self.area_m.max(1.0)
    }
}

/// Generated log files plus the topology they encode.
#[derive(Debug, Clone)]
pub struct SyntheticExperiment {
    pub positions: MotePositions,
    /// Final child → parent links the relationship log ends with.
    pub parents: ParentMap,
    pub powertracker: String,
    pub relationships: String,
    pub simulation: String,
}

impl SyntheticExperiment {
    pub fn generate(profile: &ExperimentProfile) -> anyhow::Result<Self> {
        let mut rng = StdRng::seed_from_u64(profile.seed);
        let positions = build_positions(profile, &mut rng);
        let (relationships, parents) = build_relationships(profile, &mut rng)?;
        let powertracker = build_powertracker(profile, &mut rng)?;
        let simulation = build_simulation(&positions)?;

        Ok(Self {
            positions,
            parents,
            powertracker,
            relationships,
            simulation,
        })
    }

    /// Lays the experiment out the way the analyzer expects it.
    pub fn write_to(&self, experiment: &Path) -> anyhow::Result<()> {
        let data = experiment.join("data");
        fs::create_dir_all(&data)
            .with_context(|| format!("creating {}", data.display()))?;
        for (path, contents) in [
            (experiment.join("simulation.csc"), &self.simulation),
            (data.join("powertracker.log"), &self.powertracker),
            (data.join("relationships.log"), &self.relationships),
        ] {
            fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    }
}

fn build_positions(profile: &ExperimentProfile, rng: &mut StdRng) -> MotePositions {
    let area = profile.normalized_area();
    let mut positions = MotePositions::new();
    positions.insert(0, Position::new(area / 2.0, area / 2.0));
    for id in 1..profile.normalized_motes() {
        positions.insert(
            id,
            Position::new(rng.gen_range(0.0..area), rng.gen_range(0.0..area)),
        );
    }
    positions
}

fn build_relationships(
    profile: &ExperimentProfile,
    rng: &mut StdRng,
) -> anyhow::Result<(String, ParentMap)> {
    let switch_probability = profile.switch_probability.clamp(0.0, 1.0);
    let mut log = String::new();
    let mut parents = ParentMap::new();

    for id in 1..profile.normalized_motes() {
        let joined = u64::from(id) * 1_000_000;
        let parent: MoteId = rng.gen_range(0..id);
        writeln!(log, "{}\tID:{}\tRPL: joined instance 30", joined, id)?;
        writeln!(log, "{}\tID:{}\t#L {} 1", joined, id, parent)?;
        parents.insert(id, parent);
    }

    let settled = u64::from(profile.normalized_motes()) * 1_000_000;
    for id in 1..profile.normalized_motes() {
        if !rng.gen_bool(switch_probability) {
            continue;
        }
        let previous = parents[&id];
        let next: MoteId = rng.gen_range(0..id);
        if next == previous {
            continue;
        }
        let at = settled + u64::from(id) * 1_000;
        writeln!(log, "{}\tID:{}\t#L {} 0", at, id, previous)?;
        writeln!(log, "{}\tID:{}\t#L {} 1", at, id, next)?;
        parents.insert(id, next);
    }

    Ok((log, parents))
}

fn build_powertracker(profile: &ExperimentProfile, rng: &mut StdRng) -> anyhow::Result<String> {
    let motes = profile.normalized_motes() as usize;
    let period = profile.period_us.max(1);
    let mut totals = vec![[0u64; 5]; motes];
    let mut log = String::new();

    for cycle in 1..=u64::from(profile.cycles) {
        for (id, total) in totals.iter_mut().enumerate() {
            let on = rng.gen_range(0..=period / 10);
            let tx = rng.gen_range(0..=on / 2);
            let rx = rng.gen_range(0..=on - tx);
            let interrupt = rng.gen_range(0..=period / 100);
            total[0] = cycle * period;
            total[1] += on;
            total[2] += tx;
            total[3] += rx;
            total[4] += interrupt;

            for category in PowerEventCategory::ALL {
                let value = total[category.index()];
                if category == PowerEventCategory::Monitored {
                    writeln!(log, "{}_{} {} {} us", profile.platform, id, category.tag(), value)?;
                } else {
                    let share = value as f64 / total[0] as f64 * 100.0;
                    writeln!(
                        log,
                        "{}_{} {} {} us {:.2} %",
                        profile.platform,
                        id,
                        category.tag(),
                        value,
                        share
                    )?;
                }
            }
        }
        log.push('\n');
    }

    Ok(log)
}

fn build_simulation(positions: &MotePositions) -> anyhow::Result<String> {
    let mut csc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<simconf>\n  <simulation>\n");
    for (id, position) in positions {
        write!(
            csc,
            "    <mote>\n      <interface_config>\n        org.contikios.cooja.interfaces.Position\n        <x>{}</x>\n        <y>{}</y>\n        <z>0.0</z>\n      </interface_config>\n      <interface_config>\n        org.contikios.cooja.mspmote.interfaces.MspMoteID\n        <id>{}</id>\n      </interface_config>\n    </mote>\n",
            position.x, position.y, id
        )?;
    }
    csc.push_str("  </simulation>\n</simconf>\n");
    Ok(csc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_deterministic_for_a_seed() {
        let profile = ExperimentProfile {
            seed: 7,
            ..Default::default()
        };
        let first = SyntheticExperiment::generate(&profile).unwrap();
        let second = SyntheticExperiment::generate(&profile).unwrap();
        assert_eq!(first.powertracker, second.powertracker);
        assert_eq!(first.parents, second.parents);
    }

    #[test]
    fn generator_emits_five_lines_per_mote_and_cycle() {
        let profile = ExperimentProfile {
            motes: 4,
            cycles: 3,
            ..Default::default()
        };
        let experiment = SyntheticExperiment::generate(&profile).unwrap();
        let lines = experiment
            .powertracker
            .lines()
            .filter(|line| !line.is_empty())
            .count();
        assert_eq!(lines, 4 * 3 * 5);
        assert_eq!(experiment.positions.len(), 4);
        assert_eq!(experiment.parents.len(), 3);
        assert!(experiment.parents.iter().all(|(child, parent)| parent < child));
    }

    #[test]
    fn single_mote_profile_has_no_links() {
        let profile = ExperimentProfile {
            motes: 0,
            ..Default::default()
        };
        let experiment = SyntheticExperiment::generate(&profile).unwrap();
        assert!(experiment.parents.is_empty());
        assert!(experiment.relationships.is_empty());
    }
}
