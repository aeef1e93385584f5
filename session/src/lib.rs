#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game session facade composing the world and its systems.
//!
//! A [`Session`] is what a renderer or terminal host talks to. It turns clicks
//! and drags into world commands, routes the resulting events through the
//! mission tracker, records undo snapshots, drives the settle and auto-save
//! timers, and queues [`Notification`] values for the host to drain.

mod persistence;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use merge_forge_core::{
    CellCoord, ClaimRejection, Command, EntityId, EntitySnapshot, Event, GameConfig, Layout,
    Mission, MissionId, MoveRejection, Point, Position, Reward, SpawnRejection, Stats, Tier,
    TierCatalog, Variant,
};
use merge_forge_system_history::UndoHistory;
use merge_forge_system_merging as merging;
use merge_forge_system_missions::MissionTracker;
use merge_forge_system_spawning::Spawning;
use merge_forge_world::{self as world, query, World, WorldError};
use thiserror::Error;

pub use persistence::{
    rank_sessions, LeaderboardEntry, MemoryStore, SavedSession, SessionId, SessionStore,
    StoreError, Wallet,
};

/// Failures surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The world refused a command as a precondition violation.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The attached store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The referenced entity is not on the board.
    #[error("entity {} is not on the board", .0.get())]
    UnknownEntity(EntityId),
    /// The operation does not exist for the active board variant.
    #[error("{operation} is not available on this board")]
    WrongVariant {
        /// Name of the rejected operation.
        operation: &'static str,
    },
    /// The operation needs a store and none is attached.
    #[error("no session store is attached")]
    NoStore,
}

/// Outward notifications queued for the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The board score changed.
    ScoreChanged {
        /// New score.
        score: u64,
    },
    /// A mission reached its target and can be claimed.
    MissionCompleted {
        /// Completed mission.
        mission: MissionId,
    },
    /// The grid entered a state with no legal merge and no free cell.
    GameOver {
        /// Final score.
        score: u64,
    },
    /// A background save failed. Gameplay continues.
    SaveFailed {
        /// Human readable cause.
        reason: String,
    },
    /// The saved session could not be read. Play continues on a fresh board.
    LoadFailed {
        /// Human readable cause.
        reason: String,
    },
}

/// Result of a click or a completed drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActOutcome {
    /// The clicked entity is now selected.
    Selected(EntityId),
    /// The selected entity was clicked again and is no longer selected.
    Deselected,
    /// Nothing was selected and the click hit an empty cell.
    Ignored,
    /// The entity moved to a free position.
    Moved {
        /// Entity that moved.
        entity: EntityId,
        /// New position.
        to: Position,
    },
    /// Two entities merged.
    Merged {
        /// Entity produced by the merge.
        result: EntityId,
        /// Tier of the produced entity.
        tier: Tier,
        /// Points added to the score.
        score_gained: u64,
    },
    /// The move was refused. A selection stays in place.
    Rejected(MoveRejection),
}

/// Result of a spawn request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnOutcome {
    /// A new entity was placed.
    Spawned {
        /// New entity.
        entity: EntityId,
        /// Tier drawn for it.
        tier: Tier,
        /// Where it was placed.
        position: Position,
    },
    /// No entity was placed.
    Rejected(SpawnRejection),
}

/// Result of a mission claim.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClaimOutcome {
    /// The reward was granted.
    Claimed(Reward),
    /// Nothing was granted.
    Rejected(ClaimRejection),
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    entity: EntityId,
    position: Point,
}

struct Persistence {
    store: Box<dyn SessionStore>,
    id: SessionId,
    saved: bool,
}

/// Single-player merge game session.
pub struct Session {
    config: GameConfig,
    world: World,
    spawning: Spawning,
    missions: MissionTracker,
    history: UndoHistory,
    selection: Option<EntityId>,
    drag: Option<Drag>,
    wallet: Wallet,
    notifications: Vec<Notification>,
    persistence: Option<Persistence>,
    settle_elapsed: Option<Duration>,
    autosave_elapsed: Duration,
    game_over: bool,
}

impl Session {
    /// Creates a session using the built-in catalog of the configured variant
    /// and seeds the initial batch of entities.
    pub fn new(config: GameConfig, spawning: Spawning) -> Result<Self, SessionError> {
        let catalog = match config.variant {
            Variant::Grid => TierCatalog::forge(),
            Variant::Floating => TierCatalog::salvage(),
        };
        Self::with_catalog(config, catalog, spawning)
    }

    /// Creates a session using the provided catalog and seeds the initial batch.
    pub fn with_catalog(
        config: GameConfig,
        catalog: TierCatalog,
        spawning: Spawning,
    ) -> Result<Self, SessionError> {
        let mut world = World::new(catalog);
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureLayout {
                layout: config.layout(),
            },
            &mut events,
        )?;

        let mut session = Self {
            history: UndoHistory::with_capacity(config.undo_depth),
            config,
            world,
            spawning,
            missions: MissionTracker::default(),
            selection: None,
            drag: None,
            wallet: Wallet::default(),
            notifications: Vec::new(),
            persistence: None,
            settle_elapsed: None,
            autosave_elapsed: Duration::ZERO,
            game_over: false,
        };
        session.reset()?;
        Ok(session)
    }

    /// Click dispatcher for the grid board.
    ///
    /// Selects an occupied cell when nothing is selected, deselects on a
    /// second click of the selected entity, and otherwise moves or merges the
    /// selected entity onto the clicked cell.
    pub fn select_or_act(&mut self, cell: CellCoord) -> Result<ActOutcome, SessionError> {
        if !matches!(query::layout(&self.world), Layout::Grid { .. }) {
            return Err(SessionError::WrongVariant {
                operation: "select_or_act",
            });
        }

        let selected = self
            .selection
            .filter(|id| query::entity(&self.world, *id).is_some());
        let occupant = query::entity_at(&self.world, cell).map(|snapshot| snapshot.id);

        let Some(selected) = selected else {
            self.selection = occupant;
            return Ok(occupant.map_or(ActOutcome::Ignored, ActOutcome::Selected));
        };

        if occupant == Some(selected) {
            self.selection = None;
            return Ok(ActOutcome::Deselected);
        }

        let outcome = self.perform_move(selected, Position::Cell(cell))?;
        if !matches!(outcome, ActOutcome::Rejected(_)) {
            self.selection = None;
        }
        Ok(outcome)
    }

    /// Starts dragging an entity on the floating board.
    pub fn drag_start(&mut self, entity: EntityId) -> Result<(), SessionError> {
        if !matches!(query::layout(&self.world), Layout::Floating { .. }) {
            return Err(SessionError::WrongVariant {
                operation: "drag_start",
            });
        }
        let snapshot =
            query::entity(&self.world, entity).ok_or(SessionError::UnknownEntity(entity))?;
        let Position::Point(position) = snapshot.position else {
            return Err(SessionError::UnknownEntity(entity));
        };
        self.selection = None;
        self.drag = Some(Drag { entity, position });
        Ok(())
    }

    /// Moves the drag to `point` and reports the partner a release would pair
    /// with. A max-tier pair is still reported; releasing it is rejected.
    pub fn drag_update(&mut self, point: Point) -> Result<Option<EntityId>, SessionError> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(None);
        };
        drag.position = point;
        let drag = *drag;
        Ok(self.preview_target(drag))
    }

    /// Releases the drag, committing a merge or a relocation.
    pub fn drag_end(&mut self) -> Result<ActOutcome, SessionError> {
        let Some(drag) = self.drag.take() else {
            return Ok(ActOutcome::Ignored);
        };
        if query::entity(&self.world, drag.entity).is_none() {
            return Ok(ActOutcome::Ignored);
        }
        self.perform_move(drag.entity, Position::Point(drag.position))
    }

    /// Spawns one entity drawn from the spawner.
    pub fn spawn(&mut self) -> Result<SpawnOutcome, SessionError> {
        let mut commands = Vec::new();
        if let Err(reason) = self.spawning.handle(
            &query::vacancy(&self.world),
            query::catalog(&self.world),
            &mut commands,
        ) {
            return Ok(SpawnOutcome::Rejected(reason));
        }

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events)?;
        }

        let outcome = events
            .iter()
            .find_map(|event| match event {
                Event::EntityCreated {
                    entity,
                    tier,
                    position,
                    ..
                } => Some(SpawnOutcome::Spawned {
                    entity: *entity,
                    tier: *tier,
                    position: *position,
                }),
                Event::SpawnRejected { reason } => Some(SpawnOutcome::Rejected(*reason)),
                _ => None,
            })
            .unwrap_or(SpawnOutcome::Rejected(SpawnRejection::BoardFull));
        self.dispatch(&events);
        Ok(outcome)
    }

    /// Clears the board, missions and history, then seeds the initial batch.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::ResetBoard, &mut events)?;
        self.missions.reset();
        self.history.clear();
        self.selection = None;
        self.drag = None;
        self.settle_elapsed = None;
        self.game_over = false;
        self.dispatch(&events);

        for _ in 0..self.config.initial_spawn_count() {
            if let SpawnOutcome::Rejected(_) = self.spawn()? {
                break;
            }
        }
        info!(
            "board reset with {} entities",
            query::entity_count(&self.world)
        );
        Ok(())
    }

    /// Restores the board captured before the most recent move.
    ///
    /// Returns `false` when there is nothing to undo. Mission progress and
    /// statistics keep their current values.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        let Some(snapshot) = self.history.pop() else {
            return Ok(false);
        };
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::RestoreBoard { snapshot }, &mut events)?;
        self.selection = None;
        self.drag = None;
        self.dispatch(&events);
        debug!("undo restored score {}", query::score(&self.world));
        Ok(true)
    }

    /// Claims a completed mission, crediting its reward.
    pub fn claim_mission(&mut self, mission: MissionId) -> Result<ClaimOutcome, SessionError> {
        let reward = match self.missions.claim(mission) {
            Ok(reward) => reward,
            Err(reason) => return Ok(ClaimOutcome::Rejected(reason)),
        };
        self.wallet.credit(&reward);
        if reward.points > 0 {
            let mut events = Vec::new();
            world::apply(
                &mut self.world,
                Command::AwardPoints {
                    points: reward.points,
                },
                &mut events,
            )?;
            self.dispatch(&events);
        }
        info!("claimed {mission}");
        Ok(ClaimOutcome::Claimed(reward))
    }

    /// Advances the settle and auto-save timers.
    pub fn tick(&mut self, dt: Duration) -> Result<(), SessionError> {
        if let Some(elapsed) = self.settle_elapsed {
            let elapsed = elapsed.saturating_add(dt);
            if elapsed >= self.config.settle_delay() {
                self.settle_elapsed = None;
                let mut events = Vec::new();
                world::apply(&mut self.world, Command::SettleEntities, &mut events)?;
                self.dispatch(&events);
            } else {
                self.settle_elapsed = Some(elapsed);
            }
        }

        let Some(interval) = self.config.autosave_interval() else {
            return Ok(());
        };
        if self.persistence.is_none() {
            return Ok(());
        }
        self.autosave_elapsed = self.autosave_elapsed.saturating_add(dt);
        if self.autosave_elapsed >= interval {
            self.autosave_elapsed = Duration::ZERO;
            self.autosave();
        }
        Ok(())
    }

    /// Reports whether the grid has no free cell and no mergeable pair.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        query::is_terminal(&self.world)
    }

    /// Attaches a store without loading from it.
    pub fn attach_store(&mut self, store: Box<dyn SessionStore>, id: SessionId) {
        self.persistence = Some(Persistence {
            store,
            id,
            saved: false,
        });
        self.autosave_elapsed = Duration::ZERO;
    }

    /// Attaches a store and restores the session saved under `id`, if any.
    ///
    /// Returns `true` when a saved session was restored. A store that fails
    /// to read is still attached: the failure is logged, queued as
    /// [`Notification::LoadFailed`], and play continues on the current board.
    /// A save made for the other board variant is refused without attaching.
    pub fn resume(
        &mut self,
        store: Box<dyn SessionStore>,
        id: SessionId,
    ) -> Result<bool, SessionError> {
        let restored = match store.load(&id) {
            Ok(Some(saved)) => {
                self.restore(saved)?;
                info!("resumed session {id}");
                true
            }
            Ok(None) => false,
            Err(error) => {
                warn!("loading session {id} failed: {error}");
                self.notifications.push(Notification::LoadFailed {
                    reason: error.to_string(),
                });
                false
            }
        };
        self.attach_store(store, id);
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.saved = restored;
        }
        Ok(restored)
    }

    /// Saves the full session immediately, surfacing store failures.
    pub fn save_now(&mut self) -> Result<(), SessionError> {
        let saved = self.saved_session();
        let persistence = self.persistence.as_mut().ok_or(SessionError::NoStore)?;
        persistence.store.save(&persistence.id, &saved)?;
        persistence.saved = true;
        self.autosave_elapsed = Duration::ZERO;
        info!("saved session {}", persistence.id);
        Ok(())
    }

    /// Saves one last time and closes the store.
    pub fn shutdown(mut self) -> Result<(), SessionError> {
        let saved = self.saved_session();
        let Some(mut persistence) = self.persistence.take() else {
            return Ok(());
        };
        let result = persistence.store.save(&persistence.id, &saved);
        let closed = persistence.store.close();
        result?;
        closed?;
        info!("closed session {}", persistence.id);
        Ok(())
    }

    /// Takes every queued notification.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Captures an owned copy of everything the store persists.
    #[must_use]
    pub fn saved_session(&self) -> SavedSession {
        let last_saved_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            });
        SavedSession {
            board: query::board_snapshot(&self.world),
            missions: self.missions.missions().to_vec(),
            stats: query::stats(&self.world),
            wallet: self.wallet,
            last_saved_ms,
        }
    }

    /// Read-only access to the world for rendering.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Configuration the session was created with.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Currently selected entity on the grid.
    #[must_use]
    pub fn selection(&self) -> Option<EntityId> {
        self.selection
    }

    /// Entity being dragged and its current drag position.
    #[must_use]
    pub fn dragging(&self) -> Option<(EntityId, Point)> {
        self.drag.map(|drag| (drag.entity, drag.position))
    }

    /// Current score.
    #[must_use]
    pub fn score(&self) -> u64 {
        query::score(&self.world)
    }

    /// Highest tier reached.
    #[must_use]
    pub fn highest_tier(&self) -> Tier {
        query::highest_tier(&self.world)
    }

    /// Cumulative statistics.
    #[must_use]
    pub fn stats(&self) -> Stats {
        query::stats(&self.world)
    }

    /// Mission progress in definition order.
    #[must_use]
    pub fn missions(&self) -> &[Mission] {
        self.missions.missions()
    }

    /// Rewards accumulated from claims.
    #[must_use]
    pub fn wallet(&self) -> Wallet {
        self.wallet
    }

    /// Number of moves that can be undone.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Identifier of the attached store session.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.persistence.as_ref().map(|persistence| &persistence.id)
    }

    fn perform_move(
        &mut self,
        entity: EntityId,
        target: Position,
    ) -> Result<ActOutcome, SessionError> {
        let snapshot = query::board_snapshot(&self.world);
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::MoveOrMerge { entity, target },
            &mut events,
        )?;

        let outcome = events.iter().find_map(|event| match event {
            Event::MoveRejected { reason, .. } => Some(ActOutcome::Rejected(*reason)),
            Event::EntityMoved { entity, to, .. } => Some(ActOutcome::Moved {
                entity: *entity,
                to: *to,
            }),
            Event::MergePerformed {
                result,
                tier,
                score_gained,
                ..
            } => Some(ActOutcome::Merged {
                result: *result,
                tier: *tier,
                score_gained: *score_gained,
            }),
            _ => None,
        });
        let outcome = outcome.unwrap_or(ActOutcome::Ignored);

        if matches!(outcome, ActOutcome::Moved { .. } | ActOutcome::Merged { .. }) {
            self.history.push(snapshot);
        }
        self.dispatch(&events);
        Ok(outcome)
    }

    fn preview_target(&self, drag: Drag) -> Option<EntityId> {
        let Layout::Floating { merge_radius, .. } = query::layout(&self.world) else {
            return None;
        };
        let source = query::entity(&self.world, drag.entity)?;
        let dragged = EntitySnapshot {
            position: Position::Point(drag.position),
            ..source
        };
        let candidates = query::entity_view(&self.world).into_vec();
        merging::find_merge_target(&dragged, &candidates, merge_radius).map(|target| target.id)
    }

    fn dispatch(&mut self, events: &[Event]) {
        let mut completed = Vec::new();
        self.missions.handle(events, &mut completed);

        let mut merged = false;
        for event in events {
            match event {
                Event::ScoreChanged { score } => self
                    .notifications
                    .push(Notification::ScoreChanged { score: *score }),
                Event::EntityCreated { .. } | Event::BoardRestored => {
                    self.settle_elapsed = Some(Duration::ZERO);
                }
                Event::MergePerformed { .. } => merged = true,
                _ => {}
            }
        }
        self.notifications.extend(
            completed
                .into_iter()
                .map(|mission| Notification::MissionCompleted { mission }),
        );

        let terminal = query::is_terminal(&self.world);
        if terminal && !self.game_over {
            info!("no moves left, final score {}", query::score(&self.world));
            self.notifications.push(Notification::GameOver {
                score: query::score(&self.world),
            });
        }
        self.game_over = terminal;

        if merged {
            self.sync_progress();
        }
    }

    fn restore(&mut self, saved: SavedSession) -> Result<(), SessionError> {
        let floating_save = matches!(saved.board.layout, Layout::Floating { .. });
        if floating_save != matches!(self.config.variant, Variant::Floating) {
            return Err(SessionError::WrongVariant { operation: "resume" });
        }
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::RestoreBoard {
                snapshot: saved.board,
            },
            &mut events,
        )?;
        world::apply(
            &mut self.world,
            Command::RestoreStats { stats: saved.stats },
            &mut events,
        )?;
        self.missions.restore(&saved.missions);
        self.wallet = saved.wallet;
        self.history.clear();
        self.selection = None;
        self.drag = None;
        self.game_over = query::is_terminal(&self.world);
        self.settle_elapsed = Some(Duration::ZERO);
        self.notifications.push(Notification::ScoreChanged {
            score: query::score(&self.world),
        });
        Ok(())
    }

    fn autosave(&mut self) {
        let saved = self.saved_session();
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        match persistence.store.save(&persistence.id, &saved) {
            Ok(()) => {
                persistence.saved = true;
                debug!("auto-saved session {}", persistence.id);
            }
            Err(error) => {
                warn!("auto-save of session {} failed: {error}", persistence.id);
                self.notifications.push(Notification::SaveFailed {
                    reason: error.to_string(),
                });
            }
        }
    }

    fn sync_progress(&mut self) {
        let score = query::score(&self.world);
        let highest = query::highest_tier(&self.world);
        let stats = query::stats(&self.world);
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        if !persistence.saved {
            return;
        }
        let result = persistence
            .store
            .update_score(&persistence.id, score, highest)
            .and_then(|()| persistence.store.update_stats(&persistence.id, stats));
        if let Err(error) = result {
            warn!("progress sync for session {} failed: {error}", persistence.id);
            self.notifications.push(Notification::SaveFailed {
                reason: error.to_string(),
            });
        }
    }
}
