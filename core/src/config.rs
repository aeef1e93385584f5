//! Tunable game configuration shared by the session and its hosts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Bounds, Layout, Point};

const DEFAULT_GRID_COLUMNS: u32 = 5;
const DEFAULT_GRID_ROWS: u32 = 5;
const DEFAULT_MERGE_RADIUS: f32 = 80.0;
const DEFAULT_UNDO_DEPTH: usize = 5;
const DEFAULT_AUTOSAVE_SECS: u64 = 30;
const DEFAULT_SEED: u64 = 0x6d65_7267_655f_6667;

/// Which of the two board variants a session plays on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Fixed rows by columns, adjacency merges.
    Grid,
    /// Continuous coordinates, proximity merges.
    Floating,
}

/// Complete configuration for a game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board variant.
    pub variant: Variant,
    /// Grid columns.
    pub columns: u32,
    /// Grid rows.
    pub rows: u32,
    /// Upper-left corner of the floating play area.
    pub bounds_min: Point,
    /// Lower-right corner of the floating play area.
    pub bounds_max: Point,
    /// Floating merge radius in world units.
    pub merge_radius: f32,
    /// Entities spawned after every reset. Falls back to the variant default.
    pub initial_spawns: Option<usize>,
    /// Maximum number of undo steps retained.
    pub undo_depth: usize,
    /// Delay before transient "new" flags are cleared. Falls back to the variant default.
    pub settle_delay_ms: Option<u64>,
    /// Interval between automatic saves. Zero disables auto-save.
    pub autosave_interval_secs: u64,
    /// Seed for the spawn random source.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Grid,
            columns: DEFAULT_GRID_COLUMNS,
            rows: DEFAULT_GRID_ROWS,
            bounds_min: Point::new(50.0, 50.0),
            bounds_max: Point::new(750.0, 550.0),
            merge_radius: DEFAULT_MERGE_RADIUS,
            initial_spawns: None,
            undo_depth: DEFAULT_UNDO_DEPTH,
            settle_delay_ms: None,
            autosave_interval_secs: DEFAULT_AUTOSAVE_SECS,
            seed: DEFAULT_SEED,
        }
    }
}

impl GameConfig {
    /// Default configuration for the floating variant.
    #[must_use]
    pub fn floating() -> Self {
        Self {
            variant: Variant::Floating,
            ..Self::default()
        }
    }

    /// Layout described by the configuration.
    #[must_use]
    pub fn layout(&self) -> Layout {
        match self.variant {
            Variant::Grid => Layout::Grid {
                columns: self.columns,
                rows: self.rows,
            },
            Variant::Floating => Layout::Floating {
                bounds: Bounds::new(self.bounds_min, self.bounds_max),
                merge_radius: self.merge_radius,
            },
        }
    }

    /// Number of entities spawned after every reset.
    #[must_use]
    pub fn initial_spawn_count(&self) -> usize {
        self.initial_spawns.unwrap_or(match self.variant {
            Variant::Grid => 6,
            Variant::Floating => 5,
        })
    }

    /// Delay before transient "new" flags are cleared.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.unwrap_or(match self.variant {
            Variant::Grid => 300,
            Variant::Floating => 500,
        }))
    }

    /// Interval between automatic saves, `None` when disabled.
    #[must_use]
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_secs > 0)
            .then(|| Duration::from_secs(self.autosave_interval_secs))
    }
}
