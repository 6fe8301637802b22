use serde::{Deserialize, Serialize};
use std::fmt;

/// PowerTracker statistic reported once per mote and sampling cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PowerEventCategory {
    Monitored,
    On,
    Tx,
    Rx,
    Interrupt,
}

impl PowerEventCategory {
    /// All categories in declaration order, which is also the column order.
    pub const ALL: [PowerEventCategory; 5] = [
        PowerEventCategory::Monitored,
        PowerEventCategory::On,
        PowerEventCategory::Tx,
        PowerEventCategory::Rx,
        PowerEventCategory::Interrupt,
    ];

    /// Tag written by Cooja after the mote name.
    pub fn tag(self) -> &'static str {
        match self {
            PowerEventCategory::Monitored => "MONITORED",
            PowerEventCategory::On => "ON",
            PowerEventCategory::Tx => "TX",
            PowerEventCategory::Rx => "RX",
            PowerEventCategory::Interrupt => "INT",
        }
    }

    /// Column name in the tabular output.
    pub fn field(self) -> &'static str {
        match self {
            PowerEventCategory::Monitored => "monitored_time",
            PowerEventCategory::On => "on_time",
            PowerEventCategory::Tx => "tx_time",
            PowerEventCategory::Rx => "rx_time",
            PowerEventCategory::Interrupt => "int_time",
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.field() == field)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PowerEventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
