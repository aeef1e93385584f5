#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Merge Forge engine.
//!
//! This crate defines the message surface that connects the session facade,
//! the authoritative world, and pure systems. The session submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems
//! such as the mission tracker to react to deterministically. Expected
//! rejections travel as events too; only precondition violations are errors.

pub mod config;
pub mod missions;
pub mod tiers;

pub use config::{GameConfig, Variant};
pub use missions::{
    ClaimRejection, Mission, MissionDefinition, MissionId, MissionProgress, MissionTrigger,
    Reward,
};
pub use tiers::{CatalogError, Tier, TierCatalog, TierInfo};

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the layout and clears the board.
    ConfigureLayout {
        /// Layout the world should adopt.
        layout: Layout,
    },
    /// Places a new entity of the tier at the position.
    SpawnEntity {
        /// Tier of the new entity.
        tier: Tier,
        /// Cell or point where the entity appears.
        position: Position,
    },
    /// Moves an entity to the target, merging when the target holds a partner.
    MoveOrMerge {
        /// Entity being moved.
        entity: EntityId,
        /// Destination cell (grid) or release point (floating).
        target: Position,
    },
    /// Clears the transient "new" flag on every entity.
    SettleEntities,
    /// Adds points to the score outside of merging, e.g. mission rewards.
    AwardPoints {
        /// Points to add.
        points: u64,
    },
    /// Removes every entity and zeroes score, highest tier and statistics.
    ResetBoard,
    /// Replaces the board with a previously captured snapshot.
    RestoreBoard {
        /// Snapshot to restore.
        snapshot: BoardSnapshot,
    },
    /// Replaces the cumulative statistics.
    RestoreStats {
        /// Statistics to restore.
        stats: Stats,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the layout changed and the board was cleared.
    LayoutConfigured {
        /// Layout now in effect.
        layout: Layout,
    },
    /// Confirms that an entity appeared on the board.
    EntityCreated {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Tier of the entity.
        tier: Tier,
        /// Where the entity appeared.
        position: Position,
        /// Whether a spawn or a merge produced the entity.
        origin: CreationOrigin,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Specific reason the spawn failed.
        reason: SpawnRejection,
    },
    /// Confirms that an entity moved without merging.
    EntityMoved {
        /// Entity that moved.
        entity: EntityId,
        /// Position before the move.
        from: Position,
        /// Position after the move.
        to: Position,
    },
    /// Confirms that two entities were consumed into one of the next tier.
    MergePerformed {
        /// Entity that was moved onto its partner.
        source: EntityId,
        /// Entity that was merged into.
        target: EntityId,
        /// Entity produced by the merge.
        result: EntityId,
        /// Tier of the produced entity.
        tier: Tier,
        /// Position of the produced entity.
        position: Position,
        /// Points added to the score by this merge.
        score_gained: u64,
    },
    /// Reports that a move or merge request was rejected. The board is unchanged.
    MoveRejected {
        /// Entity that was asked to move.
        entity: EntityId,
        /// Requested target.
        target: Position,
        /// Specific reason the move failed.
        reason: MoveRejection,
    },
    /// Announces that the highest tier reached increased.
    TierReached {
        /// New highest tier.
        tier: Tier,
    },
    /// Announces the new cumulative score.
    ScoreChanged {
        /// Score after the mutation.
        score: u64,
    },
    /// Confirms that transient "new" flags were cleared.
    EntitiesSettled {
        /// Number of entities whose flag was cleared; zero is valid.
        count: usize,
    },
    /// Confirms that the board was cleared.
    BoardReset,
    /// Confirms that the board was replaced by a snapshot.
    BoardRestored,
    /// Confirms that the statistics were replaced.
    StatsRestored,
}

/// Describes why an entity came into existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreationOrigin {
    /// Produced by the spawner.
    Spawned,
    /// Produced by merging two entities.
    Merged,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// Every grid cell is occupied.
    BoardFull,
    /// The requested cell already holds an entity.
    Occupied,
    /// The requested position lies outside the board or play area.
    OutOfBounds,
}

/// Reasons a move or merge request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The target lies outside the board or play area.
    OutOfBounds,
    /// The target holds an entity of a different tier.
    NotEligible,
    /// The target holds an entity of the same tier that is not a neighbour.
    NotNeighbor,
    /// Both entities are already at the highest tier.
    MaxTier,
    /// The target is the moving entity itself.
    SameEntity,
}

/// Unique identifier assigned to an entity. Never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Reports whether the two cells share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Point in the continuous floating play area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Point halfway between two points.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned rectangle bounding the floating play area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    /// Creates bounds from two opposite corners.
    #[must_use]
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Upper-left corner.
    #[must_use]
    pub const fn min(&self) -> Point {
        self.min
    }

    /// Lower-right corner.
    #[must_use]
    pub const fn max(&self) -> Point {
        self.max
    }

    /// Reports whether the point lies inside the bounds, edges included.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Maps unit coordinates in `[0, 1)` onto the bounds.
    #[must_use]
    pub fn lerp(&self, u: f32, v: f32) -> Point {
        Point::new(
            self.min.x + u * (self.max.x - self.min.x),
            self.min.y + v * (self.max.y - self.min.y),
        )
    }
}

/// Location of an entity, matching the layout variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Position {
    /// Grid cell.
    Cell(CellCoord),
    /// Continuous point.
    Point(Point),
}

/// Shape of the board the world simulates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Layout {
    /// Fixed-size grid where each cell holds at most one entity.
    Grid {
        /// Number of columns.
        columns: u32,
        /// Number of rows.
        rows: u32,
    },
    /// Unbounded collection of entities placed inside a play area.
    Floating {
        /// Play area for spawns and drops.
        bounds: Bounds,
        /// Maximum distance between merge partners.
        merge_radius: f32,
    },
}

impl Layout {
    /// Reports whether the position kind matches the layout variant.
    #[must_use]
    pub fn accepts(&self, position: Position) -> bool {
        matches!(
            (self, position),
            (Layout::Grid { .. }, Position::Cell(_)) | (Layout::Floating { .. }, Position::Point(_))
        )
    }

    /// Reports whether the position lies on the board or inside the play area.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        match (self, position) {
            (Layout::Grid { columns, rows }, Position::Cell(cell)) => {
                cell.column() < *columns && cell.row() < *rows
            }
            (Layout::Floating { bounds, .. }, Position::Point(point)) => bounds.contains(point),
            _ => false,
        }
    }
}

/// Where the next spawned entity may be placed.
#[derive(Clone, Debug, PartialEq)]
pub enum Vacancy {
    /// Empty grid cells in row-major order.
    Cells(Vec<CellCoord>),
    /// Floating play area.
    Area(Bounds),
}

/// Immutable representation of a single entity used for queries and snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Tier of the entity.
    pub tier: Tier,
    /// Current position.
    pub position: Position,
    /// Transient display flag set on creation. Game logic never reads it.
    #[serde(default)]
    pub fresh: bool,
}

/// Deep copy of the board used for undo and persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Layout the entities belong to.
    pub layout: Layout,
    /// Every entity ordered by identifier.
    pub entities: Vec<EntitySnapshot>,
    /// Cumulative score.
    pub score: u64,
    /// Highest tier reached so far.
    pub highest_tier: Tier,
}

/// Cumulative counters kept across moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Merges performed.
    pub total_merges: u64,
    /// Entities produced by the spawner.
    pub total_created: u64,
    /// Merges that produced a tier at or above the catalog milestone.
    pub ships_built: u64,
}
