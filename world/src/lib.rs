#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state management for Merge Forge.
//!
//! The world owns every entity, the grid occupancy matrix, the score, the
//! highest tier reached and the cumulative statistics. All mutation happens
//! through [`apply`]; rejected requests are broadcast as events and leave the
//! world exactly as it was.

mod entities;

use log::debug;
use merge_forge_core::{
    BoardSnapshot, CellCoord, Command, CreationOrigin, EntityId, EntitySnapshot, Event, Layout,
    MoveRejection, Position, SpawnRejection, Stats, Tier, TierCatalog,
};
use merge_forge_system_merging::{self as merging, MergePlan, Neighborhood};
use thiserror::Error;

use crate::entities::EntityRegistry;

const DEFAULT_GRID_COLUMNS: u32 = 5;
const DEFAULT_GRID_ROWS: u32 = 5;

/// Precondition violations reported by [`apply`].
///
/// These indicate a caller bug, unlike rejections, which are ordinary
/// gameplay outcomes and arrive as events.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WorldError {
    /// The command referenced an entity that does not exist.
    #[error("entity {} does not exist", .0.get())]
    UnknownEntity(EntityId),
    /// The command referenced a tier outside the catalog.
    #[error("tier rank {} is not part of the catalog", .0.rank())]
    UnknownTier(Tier),
    /// The position kind does not match the layout variant.
    #[error("position {0:?} does not match the active layout")]
    PositionMismatch(Position),
    /// A snapshot could not be restored.
    #[error("snapshot is inconsistent: {0}")]
    InvalidSnapshot(&'static str),
}

/// Represents the authoritative Merge Forge board state.
#[derive(Clone, Debug)]
pub struct World {
    catalog: TierCatalog,
    layout: Layout,
    entities: EntityRegistry,
    occupancy: OccupancyGrid,
    score: u64,
    highest_tier: Tier,
    stats: Stats,
}

impl World {
    /// Creates an empty world on the default 5×5 grid.
    #[must_use]
    pub fn new(catalog: TierCatalog) -> Self {
        let layout = Layout::Grid {
            columns: DEFAULT_GRID_COLUMNS,
            rows: DEFAULT_GRID_ROWS,
        };
        Self {
            catalog,
            occupancy: OccupancyGrid::for_layout(&layout),
            layout,
            entities: EntityRegistry::new(),
            score: 0,
            highest_tier: Tier::LOWEST,
            stats: Stats::default(),
        }
    }

    fn clear_board(&mut self) {
        self.entities.clear();
        self.occupancy = OccupancyGrid::for_layout(&self.layout);
        self.score = 0;
        self.highest_tier = Tier::LOWEST;
        self.stats = Stats::default();
    }

    fn spawn_entity(
        &mut self,
        tier: Tier,
        position: Position,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if !self.catalog.contains(tier) {
            return Err(WorldError::UnknownTier(tier));
        }
        if !self.layout.accepts(position) {
            return Err(WorldError::PositionMismatch(position));
        }

        if let Some(reason) = self.spawn_rejection(position) {
            out_events.push(Event::SpawnRejected { reason });
            return Ok(());
        }

        let entity = self.entities.insert(tier, position);
        self.occupancy.occupy(entity, position);
        self.stats.total_created = self.stats.total_created.saturating_add(1);
        debug!("spawned entity {} of rank {}", entity.get(), tier.rank());
        out_events.push(Event::EntityCreated {
            entity,
            tier,
            position,
            origin: CreationOrigin::Spawned,
        });
        Ok(())
    }

    fn spawn_rejection(&self, position: Position) -> Option<SpawnRejection> {
        if !self.layout.contains(position) {
            return Some(SpawnRejection::OutOfBounds);
        }
        if let Position::Cell(cell) = position {
            if !self.occupancy.is_free(cell) {
                return Some(if self.occupancy.free_count() == 0 {
                    SpawnRejection::BoardFull
                } else {
                    SpawnRejection::Occupied
                });
            }
        }
        None
    }

    fn move_or_merge(
        &mut self,
        entity: EntityId,
        target: Position,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let source = self
            .entities
            .get(entity)
            .map(|entity| entity.snapshot())
            .ok_or(WorldError::UnknownEntity(entity))?;
        if !self.layout.accepts(target) {
            return Err(WorldError::PositionMismatch(target));
        }

        let reject = |reason: MoveRejection, out_events: &mut Vec<Event>| {
            out_events.push(Event::MoveRejected {
                entity,
                target,
                reason,
            });
        };

        if !self.layout.contains(target) {
            reject(MoveRejection::OutOfBounds, out_events);
            return Ok(());
        }

        let neighborhood = Neighborhood::for_layout(&self.layout);
        let partner = match (self.layout, target) {
            (Layout::Grid { .. }, Position::Cell(cell)) => self
                .occupancy
                .occupant(cell)
                .and_then(|occupant| self.entities.get(occupant))
                .map(|partner| (source, partner.snapshot())),
            (Layout::Floating { merge_radius, .. }, Position::Point(_)) => {
                let dragged = EntitySnapshot {
                    position: target,
                    ..source
                };
                let candidates: Vec<EntitySnapshot> =
                    self.entities.iter().map(|entity| entity.snapshot()).collect();
                merging::find_merge_target(&dragged, &candidates, merge_radius)
                    .map(|partner| (dragged, *partner))
            }
            _ => None,
        };

        match partner {
            Some((moved, partner)) => {
                match merging::plan_merge(&moved, &partner, &self.catalog, neighborhood) {
                    Ok(plan) => self.execute_merge(source.id, partner.id, plan, out_events),
                    Err(reason) => reject(reason, out_events),
                }
            }
            None => self.relocate(entity, source.position, target, out_events),
        }
        Ok(())
    }

    fn execute_merge(
        &mut self,
        source: EntityId,
        target: EntityId,
        plan: MergePlan,
        out_events: &mut Vec<Event>,
    ) {
        for consumed in [source, target] {
            if let Some(removed) = self.entities.remove(consumed) {
                self.occupancy.vacate(removed.position);
            }
        }

        let result = self.entities.insert(plan.tier, plan.position);
        self.occupancy.occupy(result, plan.position);
        self.score = self.score.saturating_add(plan.value);
        self.stats.total_merges = self.stats.total_merges.saturating_add(1);
        if plan.tier >= self.catalog.milestone() {
            self.stats.ships_built = self.stats.ships_built.saturating_add(1);
        }

        debug!(
            "merged {} into {} producing {} of rank {}",
            source.get(),
            target.get(),
            result.get(),
            plan.tier.rank()
        );

        out_events.push(Event::MergePerformed {
            source,
            target,
            result,
            tier: plan.tier,
            position: plan.position,
            score_gained: plan.value,
        });
        out_events.push(Event::EntityCreated {
            entity: result,
            tier: plan.tier,
            position: plan.position,
            origin: CreationOrigin::Merged,
        });
        if plan.tier > self.highest_tier {
            self.highest_tier = plan.tier;
            out_events.push(Event::TierReached { tier: plan.tier });
        }
        out_events.push(Event::ScoreChanged { score: self.score });
    }

    fn relocate(
        &mut self,
        entity: EntityId,
        from: Position,
        to: Position,
        out_events: &mut Vec<Event>,
    ) {
        self.occupancy.vacate(from);
        self.occupancy.occupy(entity, to);
        if let Some(stored) = self.entities.get_mut(entity) {
            stored.position = to;
        }
        out_events.push(Event::EntityMoved { entity, from, to });
    }

    fn settle(&mut self, out_events: &mut Vec<Event>) {
        let mut count = 0;
        for entity in self.entities.iter_mut().filter(|entity| entity.fresh) {
            entity.fresh = false;
            count += 1;
        }
        out_events.push(Event::EntitiesSettled { count });
    }

    fn restore_board(
        &mut self,
        snapshot: BoardSnapshot,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if !self.catalog.contains(snapshot.highest_tier) {
            return Err(WorldError::UnknownTier(snapshot.highest_tier));
        }

        let mut occupancy = OccupancyGrid::for_layout(&snapshot.layout);
        for (index, entity) in snapshot.entities.iter().enumerate() {
            if !self.catalog.contains(entity.tier) {
                return Err(WorldError::UnknownTier(entity.tier));
            }
            if !snapshot.layout.contains(entity.position) {
                return Err(WorldError::InvalidSnapshot("entity outside the layout"));
            }
            if snapshot.entities[..index]
                .iter()
                .any(|other| other.id == entity.id)
            {
                return Err(WorldError::InvalidSnapshot("duplicate entity identifier"));
            }
            if let Position::Cell(cell) = entity.position {
                if !occupancy.is_free(cell) {
                    return Err(WorldError::InvalidSnapshot("two entities share a cell"));
                }
            }
            occupancy.occupy(entity.id, entity.position);
        }

        self.layout = snapshot.layout;
        self.occupancy = occupancy;
        self.entities.replace(&snapshot.entities);
        self.score = snapshot.score;
        self.highest_tier = snapshot.highest_tier;
        out_events.push(Event::BoardRestored);
        out_events.push(Event::ScoreChanged { score: self.score });
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Returns an error only for precondition violations; the world is left
/// untouched in that case.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::ConfigureLayout { layout } => {
            world.layout = layout;
            world.clear_board();
            out_events.push(Event::LayoutConfigured { layout });
        }
        Command::SpawnEntity { tier, position } => {
            world.spawn_entity(tier, position, out_events)?;
        }
        Command::MoveOrMerge { entity, target } => {
            world.move_or_merge(entity, target, out_events)?;
        }
        Command::SettleEntities => world.settle(out_events),
        Command::AwardPoints { points } => {
            world.score = world.score.saturating_add(points);
            out_events.push(Event::ScoreChanged { score: world.score });
        }
        Command::ResetBoard => {
            world.clear_board();
            out_events.push(Event::BoardReset);
            out_events.push(Event::ScoreChanged { score: 0 });
        }
        Command::RestoreBoard { snapshot } => {
            world.restore_board(snapshot, out_events)?;
        }
        Command::RestoreStats { stats } => {
            world.stats = stats;
            out_events.push(Event::StatsRestored);
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use merge_forge_core::{
        BoardSnapshot, CellCoord, EntityId, EntitySnapshot, Layout, Stats, Tier, TierCatalog,
        Vacancy,
    };
    use merge_forge_system_merging as merging;

    use super::{OccupancyGrid, World};

    /// Provides read-only access to the tier catalog.
    #[must_use]
    pub fn catalog(world: &World) -> &TierCatalog {
        &world.catalog
    }

    /// Layout currently in effect.
    #[must_use]
    pub fn layout(world: &World) -> Layout {
        world.layout
    }

    /// Cumulative score.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score
    }

    /// Highest tier reached so far.
    #[must_use]
    pub fn highest_tier(world: &World) -> Tier {
        world.highest_tier
    }

    /// Cumulative statistics.
    #[must_use]
    pub fn stats(world: &World) -> Stats {
        world.stats
    }

    /// Number of entities on the board.
    #[must_use]
    pub fn entity_count(world: &World) -> usize {
        world.entities.len()
    }

    /// Snapshot of a single entity, if it exists.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(id).map(|entity| entity.snapshot())
    }

    /// Snapshot of the entity occupying the cell, if any.
    #[must_use]
    pub fn entity_at(world: &World, cell: CellCoord) -> Option<EntitySnapshot> {
        world
            .occupancy
            .occupant(cell)
            .and_then(|id| entity(world, id))
    }

    /// Captures a read-only view of every entity on the board.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView {
            snapshots: world.entities.iter().map(|entity| entity.snapshot()).collect(),
        }
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView {
            grid: &world.occupancy,
        }
    }

    /// Describes where the next entity may be placed.
    #[must_use]
    pub fn vacancy(world: &World) -> Vacancy {
        match world.layout {
            Layout::Grid { .. } => Vacancy::Cells(world.occupancy.free_cells()),
            Layout::Floating { bounds, .. } => Vacancy::Area(bounds),
        }
    }

    /// Captures a deep copy of the board for undo and persistence.
    #[must_use]
    pub fn board_snapshot(world: &World) -> BoardSnapshot {
        BoardSnapshot {
            layout: world.layout,
            entities: entity_view(world).into_vec(),
            score: world.score,
            highest_tier: world.highest_tier,
        }
    }

    /// Reports whether the grid is full and no adjacent pair shares a tier.
    ///
    /// Recomputed on every call. Floating space never ends.
    #[must_use]
    pub fn is_terminal(world: &World) -> bool {
        let Layout::Grid { columns, rows } = world.layout else {
            return false;
        };
        if world.occupancy.free_count() > 0 {
            return false;
        }
        !merging::has_adjacent_pair(columns, rows, |cell| {
            entity_at(world, cell).map(|snapshot| snapshot.tier)
        })
    }

    /// Read-only snapshot describing all entities on the board.
    #[derive(Clone, Debug)]
    pub struct EntityView {
        snapshots: Vec<EntitySnapshot>,
    }

    impl EntityView {
        /// Iterator over the captured snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
            self.snapshots.iter()
        }

        /// Number of captured snapshots.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether the view is empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<EntitySnapshot> {
            self.snapshots
        }
    }

    /// Read-only view into the dense occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        grid: &'a OccupancyGrid,
    }

    impl<'a> OccupancyView<'a> {
        /// Returns the entity occupying the provided cell, if any.
        #[must_use]
        pub fn occupant(&self, cell: CellCoord) -> Option<EntityId> {
            self.grid.occupant(cell)
        }

        /// Reports whether the cell lies on the grid and is empty.
        #[must_use]
        pub fn is_free(&self, cell: CellCoord) -> bool {
            self.grid.is_free(cell)
        }

        /// Returns an iterator over all cells in row-major order.
        pub fn iter(&self) -> impl Iterator<Item = Option<EntityId>> + 'a {
            self.grid.cells.iter().copied()
        }

        /// Number of occupied cells.
        #[must_use]
        pub fn occupied_count(&self) -> usize {
            self.grid.cells.len() - self.grid.free_count()
        }

        /// Provides the dimensions of the underlying occupancy grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            (self.grid.columns, self.grid.rows)
        }
    }
}

/// Dense matrix of cell occupants. Empty for floating layouts.
#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<EntityId>>,
}

impl OccupancyGrid {
    fn for_layout(layout: &Layout) -> Self {
        match layout {
            Layout::Grid { columns, rows } => Self::new(*columns, *rows),
            Layout::Floating { .. } => Self::new(0, 0),
        }
    }

    fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    fn occupant(&self, cell: CellCoord) -> Option<EntityId> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    fn is_free(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(false, |index| self.cells[index].is_none())
    }

    fn free_count(&self) -> usize {
        self.cells.iter().filter(|slot| slot.is_none()).count()
    }

    fn free_cells(&self) -> Vec<CellCoord> {
        let mut free = Vec::new();
        for row in 0..self.rows {
            for column in 0..self.columns {
                let cell = CellCoord::new(column, row);
                if self.is_free(cell) {
                    free.push(cell);
                }
            }
        }
        free
    }

    fn occupy(&mut self, entity: EntityId, position: Position) {
        if let Position::Cell(cell) = position {
            if let Some(index) = self.index(cell) {
                self.cells[index] = Some(entity);
            }
        }
    }

    fn vacate(&mut self, position: Position) {
        if let Position::Cell(cell) = position {
            if let Some(index) = self.index(cell) {
                self.cells[index] = None;
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_forge_core::{Bounds, Point};

    fn cell(column: u32, row: u32) -> Position {
        Position::Cell(CellCoord::new(column, row))
    }

    fn spawn(world: &mut World, rank: u8, position: Position) -> EntityId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEntity {
                tier: Tier::new(rank),
                position,
            },
            &mut events,
        )
        .expect("spawn command is valid");
        match events.as_slice() {
            [Event::EntityCreated { entity, .. }] => *entity,
            other => panic!("unexpected events: {other:?}"),
        }
    }

    fn floating_world() -> World {
        let mut world = World::new(TierCatalog::salvage());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureLayout {
                layout: Layout::Floating {
                    bounds: Bounds::new(Point::new(0.0, 0.0), Point::new(800.0, 600.0)),
                    merge_radius: 80.0,
                },
            },
            &mut events,
        )
        .expect("layout is valid");
        world
    }

    #[test]
    fn occupancy_matches_entity_registry() {
        let mut world = World::new(TierCatalog::forge());
        let first = spawn(&mut world, 1, cell(0, 0));
        let _ = spawn(&mut world, 1, cell(1, 0));
        let _ = spawn(&mut world, 2, cell(4, 4));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity: first,
                target: cell(1, 0),
            },
            &mut events,
        )
        .expect("entity exists");

        assert_eq!(
            query::occupancy_view(&world).occupied_count(),
            query::entity_count(&world)
        );
        assert_eq!(query::entity_count(&world), 2);
    }

    #[test]
    fn merge_emits_events_in_order() {
        let mut world = World::new(TierCatalog::forge());
        let source = spawn(&mut world, 1, cell(2, 2));
        let target = spawn(&mut world, 1, cell(3, 2));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity: source,
                target: cell(3, 2),
            },
            &mut events,
        )
        .expect("entity exists");

        let result = match events.first() {
            Some(Event::MergePerformed {
                source: s,
                target: t,
                result,
                score_gained: 25,
                ..
            }) if *s == source && *t == target => *result,
            other => panic!("unexpected first event: {other:?}"),
        };
        assert_eq!(
            &events[1..],
            &[
                Event::EntityCreated {
                    entity: result,
                    tier: Tier::new(2),
                    position: cell(3, 2),
                    origin: CreationOrigin::Merged,
                },
                Event::TierReached { tier: Tier::new(2) },
                Event::ScoreChanged { score: 25 },
            ]
        );
        assert!(query::entity_at(&world, CellCoord::new(2, 2)).is_none());
        assert_eq!(query::stats(&world).total_merges, 1);
    }

    #[test]
    fn unknown_entity_is_a_precondition_violation() {
        let mut world = World::new(TierCatalog::forge());
        let mut events = Vec::new();
        let result = apply(
            &mut world,
            Command::MoveOrMerge {
                entity: EntityId::new(99),
                target: cell(0, 0),
            },
            &mut events,
        );
        assert_eq!(result, Err(WorldError::UnknownEntity(EntityId::new(99))));
        assert!(events.is_empty());
    }

    #[test]
    fn mismatched_position_kind_is_a_precondition_violation() {
        let mut world = World::new(TierCatalog::forge());
        let mut events = Vec::new();
        let point = Position::Point(Point::new(1.0, 1.0));
        let result = apply(
            &mut world,
            Command::SpawnEntity {
                tier: Tier::new(1),
                position: point,
            },
            &mut events,
        );
        assert_eq!(result, Err(WorldError::PositionMismatch(point)));
        assert_eq!(query::entity_count(&world), 0);
    }

    #[test]
    fn spawn_on_full_grid_reports_board_full() {
        let mut world = World::new(TierCatalog::forge());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureLayout {
                layout: Layout::Grid {
                    columns: 1,
                    rows: 1,
                },
            },
            &mut events,
        )
        .expect("layout is valid");
        let _ = spawn(&mut world, 1, cell(0, 0));

        events.clear();
        apply(
            &mut world,
            Command::SpawnEntity {
                tier: Tier::new(1),
                position: cell(0, 0),
            },
            &mut events,
        )
        .expect("spawn command is valid");
        assert_eq!(
            events,
            vec![Event::SpawnRejected {
                reason: SpawnRejection::BoardFull,
            }]
        );
        assert_eq!(query::stats(&world).total_created, 1);
    }

    #[test]
    fn rejected_move_leaves_board_untouched() {
        let mut world = World::new(TierCatalog::forge());
        let source = spawn(&mut world, 1, cell(0, 0));
        let _ = spawn(&mut world, 2, cell(1, 0));
        let before = query::board_snapshot(&world);

        let mut events = Vec::new();
        for target in [cell(1, 0), cell(9, 9), cell(0, 0)] {
            apply(
                &mut world,
                Command::MoveOrMerge {
                    entity: source,
                    target,
                },
                &mut events,
            )
            .expect("entity exists");
        }

        let reasons: Vec<MoveRejection> = events
            .iter()
            .filter_map(|event| match event {
                Event::MoveRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                MoveRejection::NotEligible,
                MoveRejection::OutOfBounds,
                MoveRejection::SameEntity,
            ]
        );
        assert_eq!(query::board_snapshot(&world), before);
    }

    #[test]
    fn max_tier_pair_is_rejected() {
        let mut world = World::new(TierCatalog::forge());
        let max = query::catalog(&world).max_tier().rank();
        let source = spawn(&mut world, max, cell(0, 0));
        let _ = spawn(&mut world, max, cell(0, 1));
        let before = query::board_snapshot(&world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity: source,
                target: cell(0, 1),
            },
            &mut events,
        )
        .expect("entity exists");

        assert!(matches!(
            events.as_slice(),
            [Event::MoveRejected {
                reason: MoveRejection::MaxTier,
                ..
            }]
        ));
        assert_eq!(query::board_snapshot(&world), before);
    }

    #[test]
    fn move_to_empty_cell_keeps_score() {
        let mut world = World::new(TierCatalog::forge());
        let entity = spawn(&mut world, 3, cell(0, 0));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity,
                target: cell(4, 4),
            },
            &mut events,
        )
        .expect("entity exists");

        assert_eq!(
            events,
            vec![Event::EntityMoved {
                entity,
                from: cell(0, 0),
                to: cell(4, 4),
            }]
        );
        assert_eq!(query::score(&world), 0);
        assert_eq!(
            query::entity_at(&world, CellCoord::new(4, 4)).map(|s| s.id),
            Some(entity)
        );
    }

    #[test]
    fn floating_drop_merges_with_nearest_partner() {
        let mut world = floating_world();
        let dragged = spawn(&mut world, 1, Position::Point(Point::new(100.0, 100.0)));
        let _near = spawn(&mut world, 1, Position::Point(Point::new(130.0, 100.0)));
        let _far = spawn(&mut world, 1, Position::Point(Point::new(400.0, 100.0)));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity: dragged,
                target: Position::Point(Point::new(100.0, 100.0)),
            },
            &mut events,
        )
        .expect("entity exists");

        let merged: Vec<EntitySnapshot> = query::entity_view(&world)
            .iter()
            .copied()
            .filter(|snapshot| snapshot.tier == Tier::new(2))
            .collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].position, Position::Point(Point::new(115.0, 100.0)));
        assert_eq!(query::entity_count(&world), 2);
    }

    #[test]
    fn floating_drop_without_partner_relocates() {
        let mut world = floating_world();
        let dragged = spawn(&mut world, 1, Position::Point(Point::new(100.0, 100.0)));
        let _other = spawn(&mut world, 2, Position::Point(Point::new(110.0, 100.0)));

        let mut events = Vec::new();
        let target = Position::Point(Point::new(500.0, 300.0));
        apply(
            &mut world,
            Command::MoveOrMerge {
                entity: dragged,
                target,
            },
            &mut events,
        )
        .expect("entity exists");

        assert_eq!(query::entity(&world, dragged).map(|s| s.position), Some(target));
        assert!(!query::is_terminal(&world));
    }

    #[test]
    fn settle_is_idempotent() {
        let mut world = World::new(TierCatalog::forge());
        let entity = spawn(&mut world, 1, cell(0, 0));
        assert_eq!(query::entity(&world, entity).map(|s| s.fresh), Some(true));

        let mut events = Vec::new();
        apply(&mut world, Command::SettleEntities, &mut events).expect("settle never fails");
        apply(&mut world, Command::SettleEntities, &mut events).expect("settle never fails");

        assert_eq!(
            events,
            vec![
                Event::EntitiesSettled { count: 1 },
                Event::EntitiesSettled { count: 0 },
            ]
        );
        assert_eq!(query::entity(&world, entity).map(|s| s.fresh), Some(false));
    }

    #[test]
    fn restore_rejects_shared_cells() {
        let mut world = World::new(TierCatalog::forge());
        let shared = EntitySnapshot {
            id: EntityId::new(1),
            tier: Tier::new(1),
            position: cell(0, 0),
            fresh: false,
        };
        let snapshot = BoardSnapshot {
            layout: query::layout(&world),
            entities: vec![
                shared,
                EntitySnapshot {
                    id: EntityId::new(2),
                    ..shared
                },
            ],
            score: 0,
            highest_tier: Tier::LOWEST,
        };

        let mut events = Vec::new();
        let result = apply(&mut world, Command::RestoreBoard { snapshot }, &mut events);
        assert_eq!(
            result,
            Err(WorldError::InvalidSnapshot("two entities share a cell"))
        );
        assert!(events.is_empty());
    }

    #[test]
    fn terminal_requires_full_board_without_pairs() {
        let mut world = World::new(TierCatalog::forge());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureLayout {
                layout: Layout::Grid {
                    columns: 2,
                    rows: 2,
                },
            },
            &mut events,
        )
        .expect("layout is valid");

        let _ = spawn(&mut world, 1, cell(0, 0));
        let _ = spawn(&mut world, 2, cell(1, 0));
        let _ = spawn(&mut world, 2, cell(0, 1));
        assert!(!query::is_terminal(&world), "an empty cell remains");

        let last = spawn(&mut world, 1, cell(1, 1));
        assert!(query::is_terminal(&world), "checkerboard has no pairs");

        let mut pair_world = world.clone();
        let mut events = Vec::new();
        apply(
            &mut pair_world,
            Command::RestoreBoard {
                snapshot: BoardSnapshot {
                    entities: query::entity_view(&world)
                        .iter()
                        .map(|snapshot| {
                            if snapshot.id == last {
                                EntitySnapshot {
                                    tier: Tier::new(2),
                                    ..*snapshot
                                }
                            } else {
                                *snapshot
                            }
                        })
                        .collect(),
                    ..query::board_snapshot(&world)
                },
            },
            &mut events,
        )
        .expect("snapshot is consistent");
        assert!(!query::is_terminal(&pair_world), "adjacent pair can merge");
    }
}
