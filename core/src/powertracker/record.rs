use crate::powertracker::category::PowerEventCategory;
use crate::prelude::MoteId;
use serde::{Deserialize, Serialize};

/// One synchronized PowerTracker sample for a mote, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerRecord {
    pub mote_id: MoteId,
    pub monitored_time: f64,
    pub on_time: f64,
    pub tx_time: f64,
    pub rx_time: f64,
    #[serde(rename = "int_time")]
    pub interrupt_time: f64,
}

impl PowerRecord {
    /// Builds a record from per-category times given in declaration order.
    pub fn from_times(mote_id: MoteId, times: [f64; 5]) -> Self {
        Self {
            mote_id,
            monitored_time: times[0],
            on_time: times[1],
            tx_time: times[2],
            rx_time: times[3],
            interrupt_time: times[4],
        }
    }

    pub fn time(&self, category: PowerEventCategory) -> f64 {
        match category {
            PowerEventCategory::Monitored => self.monitored_time,
            PowerEventCategory::On => self.on_time,
            PowerEventCategory::Tx => self.tx_time,
            PowerEventCategory::Rx => self.rx_time,
            PowerEventCategory::Interrupt => self.interrupt_time,
        }
    }
}

/// Column names of the tabular output, in order.
pub fn header() -> Vec<&'static str> {
    std::iter::once("mote_id")
        .chain(PowerEventCategory::ALL.iter().map(|category| category.field()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lists_mote_then_every_category() {
        assert_eq!(
            header(),
            vec![
                "mote_id",
                "monitored_time",
                "on_time",
                "tx_time",
                "rx_time",
                "int_time"
            ]
        );
    }

    #[test]
    fn from_times_places_each_category() {
        let record = PowerRecord::from_times(7, [1.0, 2.0, 3.0, 4.0, 5.0]);
        for (position, category) in PowerEventCategory::ALL.iter().enumerate() {
            assert_eq!(record.time(*category), (position + 1) as f64);
        }
    }
}
