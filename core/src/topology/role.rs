use crate::prelude::MoteId;
use serde::{Deserialize, Serialize};

/// Mote id of the DODAG root.
pub const ROOT_ID: MoteId = 0;

/// Visual role of a mote in the rendered DODAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleColor {
    Root,
    Normal,
    Suspect,
}

impl RoleColor {
    /// Role of `mote_id` given the highest declared id. In an adversarial
    /// scenario the highest id is the attacker.
    pub fn classify(mote_id: MoteId, max_id: Option<MoteId>, adversarial: bool) -> Self {
        if mote_id == ROOT_ID {
            RoleColor::Root
        } else if adversarial && Some(mote_id) == max_id {
            RoleColor::Suspect
        } else {
            RoleColor::Normal
        }
    }

    /// Fill color handed to the renderer.
    pub fn fill(self) -> &'static str {
        match self {
            RoleColor::Root => "green",
            RoleColor::Normal => "yellow",
            RoleColor::Suspect => "red",
        }
    }
}
