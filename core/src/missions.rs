//! Mission definitions and progress records shared by the tracker and persistence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Tier;

/// Unique identifier assigned to a mission definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissionId(u32);

impl MissionId {
    /// Creates a new mission identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mission_{}", self.0)
    }
}

/// Condition that advances a mission's progress counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionTrigger {
    /// Produce entities of the tier by merging.
    Create(Tier),
    /// Have entities of the tier appear on the board, spawned or merged.
    Collect(Tier),
    /// Perform merges of any tier.
    MergeCount,
    /// Raise the highest tier reached to at least the tier.
    ReachTier(Tier),
}

/// Payload granted once when a completed mission is claimed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Points added to the board score.
    pub points: u64,
    /// Optional secondary currency.
    pub currency: Option<u64>,
    /// Experience granted to the player.
    pub experience: u64,
}

/// Static description of a mission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDefinition {
    /// Identifier of the mission.
    pub id: MissionId,
    /// Short title, opaque to the engine.
    pub title: String,
    /// Longer description, opaque to the engine.
    pub description: String,
    /// Condition that advances progress.
    pub trigger: MissionTrigger,
    /// Progress required for completion.
    pub target_count: u32,
    /// Payload returned when the mission is claimed.
    pub reward: Reward,
}

/// Mutable progress attached to a mission definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionProgress {
    /// Progress accumulated so far. Never decreases.
    pub current_count: u32,
    /// Set once progress reaches the target and never cleared.
    pub completed: bool,
    /// Set once the reward was handed out. Implies `completed`.
    pub claimed: bool,
}

/// Mission definition paired with its current progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Static description.
    pub definition: MissionDefinition,
    /// Current progress.
    pub progress: MissionProgress,
}

impl Mission {
    /// Creates a mission with no progress.
    #[must_use]
    pub fn fresh(definition: MissionDefinition) -> Self {
        Self {
            definition,
            progress: MissionProgress::default(),
        }
    }

    /// Identifier of the mission.
    #[must_use]
    pub fn id(&self) -> MissionId {
        self.definition.id
    }

    /// Reports whether the reward can be claimed right now.
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        self.progress.completed && !self.progress.claimed
    }
}

/// Reasons a mission claim is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimRejection {
    /// No mission with the identifier is tracked.
    UnknownMission,
    /// The mission has not reached its target yet.
    NotCompleted,
    /// The reward was already handed out.
    AlreadyClaimed,
}

impl fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMission => write!(f, "no such mission"),
            Self::NotCompleted => write!(f, "mission is not completed yet"),
            Self::AlreadyClaimed => write!(f, "mission reward was already claimed"),
        }
    }
}
