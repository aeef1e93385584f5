#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mission tracker that turns world events into mission progress.
//!
//! The tracker consumes the same event slices every other system sees and
//! reports missions that crossed their target. Rewards are handed out at most
//! once per mission through [`MissionTracker::claim`].

use log::{debug, warn};
use merge_forge_core::{
    ClaimRejection, CreationOrigin, Event, Mission, MissionDefinition, MissionId, MissionTrigger,
    Reward, Tier,
};

/// Builds the standard set of five missions.
#[must_use]
pub fn standard_missions() -> Vec<MissionDefinition> {
    vec![
        definition(
            1,
            "First Steps",
            "Create your first Meteorite Fragment",
            MissionTrigger::Create(Tier::new(2)),
            1,
            Reward {
                points: 100,
                currency: None,
                experience: 50,
            },
        ),
        definition(
            2,
            "Space Collector",
            "Gather 5 Spatial Minerals",
            MissionTrigger::Collect(Tier::new(3)),
            5,
            Reward {
                points: 500,
                currency: Some(10),
                experience: 100,
            },
        ),
        definition(
            3,
            "Rookie Builder",
            "Create your first Small Ship",
            MissionTrigger::Create(Tier::new(6)),
            1,
            Reward {
                points: 2_000,
                currency: Some(25),
                experience: 300,
            },
        ),
        definition(
            4,
            "Merge Master",
            "Perform 20 successful merges",
            MissionTrigger::MergeCount,
            20,
            Reward {
                points: 1_000,
                currency: Some(15),
                experience: 200,
            },
        ),
        definition(
            5,
            "To Infinity",
            "Reach rank 8 (Combat Ship)",
            MissionTrigger::ReachTier(Tier::new(8)),
            1,
            Reward {
                points: 10_000,
                currency: Some(100),
                experience: 1_000,
            },
        ),
    ]
}

fn definition(
    id: u32,
    title: &str,
    description: &str,
    trigger: MissionTrigger,
    target_count: u32,
    reward: Reward,
) -> MissionDefinition {
    MissionDefinition {
        id: MissionId::new(id),
        title: title.to_owned(),
        description: description.to_owned(),
        trigger,
        target_count,
        reward,
    }
}

/// Tracks progress for an ordered list of missions.
#[derive(Clone, Debug)]
pub struct MissionTracker {
    definitions: Vec<MissionDefinition>,
    missions: Vec<Mission>,
}

impl Default for MissionTracker {
    fn default() -> Self {
        Self::new(standard_missions())
    }
}

impl MissionTracker {
    /// Creates a tracker with fresh progress for every definition.
    #[must_use]
    pub fn new(definitions: Vec<MissionDefinition>) -> Self {
        let missions = definitions.iter().cloned().map(Mission::fresh).collect();
        Self {
            definitions,
            missions,
        }
    }

    /// Consumes world events and records missions completed by them.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<MissionId>) {
        for event in events {
            for mission in &mut self.missions {
                if mission.progress.completed {
                    continue;
                }
                let target = mission.definition.target_count;
                let next = match (mission.definition.trigger, event) {
                    (
                        MissionTrigger::Create(wanted),
                        Event::EntityCreated {
                            tier,
                            origin: CreationOrigin::Merged,
                            ..
                        },
                    ) if *tier == wanted => mission.progress.current_count.saturating_add(1),
                    (MissionTrigger::Collect(wanted), Event::EntityCreated { tier, .. })
                        if *tier == wanted =>
                    {
                        mission.progress.current_count.saturating_add(1)
                    }
                    (MissionTrigger::MergeCount, Event::MergePerformed { .. }) => {
                        mission.progress.current_count.saturating_add(1)
                    }
                    (MissionTrigger::ReachTier(wanted), Event::TierReached { tier })
                        if *tier >= wanted =>
                    {
                        target
                    }
                    _ => continue,
                };

                mission.progress.current_count = next.min(target);
                if mission.progress.current_count >= target {
                    mission.progress.completed = true;
                    debug!("mission {} completed", mission.id());
                    out.push(mission.id());
                }
            }
        }
    }

    /// Hands out the reward of a completed, unclaimed mission.
    pub fn claim(&mut self, id: MissionId) -> Result<Reward, ClaimRejection> {
        let mission = self
            .missions
            .iter_mut()
            .find(|mission| mission.id() == id)
            .ok_or(ClaimRejection::UnknownMission)?;
        if !mission.progress.completed {
            return Err(ClaimRejection::NotCompleted);
        }
        if mission.progress.claimed {
            return Err(ClaimRejection::AlreadyClaimed);
        }
        mission.progress.claimed = true;
        Ok(mission.definition.reward)
    }

    /// Restores fresh progress for every mission.
    pub fn reset(&mut self) {
        self.missions = self
            .definitions
            .iter()
            .cloned()
            .map(Mission::fresh)
            .collect();
    }

    /// Replaces progress with previously saved records.
    ///
    /// Records are matched by identifier; unknown identifiers are skipped and
    /// missions absent from the records start fresh.
    pub fn restore(&mut self, saved: &[Mission]) {
        self.reset();
        for record in saved {
            match self
                .missions
                .iter_mut()
                .find(|mission| mission.id() == record.id())
            {
                Some(mission) => {
                    let mut progress = record.progress;
                    let target = mission.definition.target_count;
                    progress.current_count = progress.current_count.min(target);
                    progress.completed |= progress.current_count >= target;
                    progress.claimed &= progress.completed;
                    mission.progress = progress;
                }
                None => warn!("ignoring saved progress for unknown {}", record.id()),
            }
        }
    }

    /// Current missions in definition order.
    #[must_use]
    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    /// Looks up a single mission.
    #[must_use]
    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.iter().find(|mission| mission.id() == id)
    }
}
