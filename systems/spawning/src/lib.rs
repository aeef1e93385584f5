#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting entity spawn commands.
//!
//! Every spawn draws its placement first and its tier second from a pluggable
//! [`UniformSource`], so a full grid consumes no tier draw and a scripted
//! source reproduces a game exactly.

use std::collections::VecDeque;
use std::fmt;

use merge_forge_core::{Command, Position, SpawnRejection, Tier, TierCatalog, Vacancy};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Source of uniformly distributed values in `[0, 1)`.
pub trait UniformSource {
    /// Produces the next value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Reproducible source backed by a ChaCha8 stream.
#[derive(Clone, Debug)]
pub struct SeededSource {
    rng: ChaCha8Rng,
}

impl SeededSource {
    /// Creates a source whose stream is fully determined by `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl UniformSource for SeededSource {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Source that replays a fixed sequence of values.
///
/// Values are clamped into `[0, 1)`. Once the script runs out the source
/// yields `0.0`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    values: VecDeque<f64>,
}

impl ScriptedSource {
    /// Creates a source replaying `values` in order.
    #[must_use]
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Number of scripted values not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl UniformSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        let value = self.values.pop_front().unwrap_or(0.0);
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that picks the tier and placement of the next spawn.
pub struct Spawning {
    source: Box<dyn UniformSource>,
}

impl fmt::Debug for Spawning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawning").finish_non_exhaustive()
    }
}

impl Spawning {
    /// Creates a new spawning system seeded from the configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_source(SeededSource::from_seed(config.rng_seed))
    }

    /// Creates a spawning system drawing from the provided source.
    #[must_use]
    pub fn with_source<S>(source: S) -> Self
    where
        S: UniformSource + 'static,
    {
        Self {
            source: Box::new(source),
        }
    }

    /// Emits a spawn command for the vacancy, or reports a full board.
    pub fn handle(
        &mut self,
        vacancy: &Vacancy,
        catalog: &TierCatalog,
        out: &mut Vec<Command>,
    ) -> Result<(), SpawnRejection> {
        let position = self
            .choose_position(vacancy)
            .ok_or(SpawnRejection::BoardFull)?;
        let tier = self.choose_tier(catalog);
        out.push(Command::SpawnEntity { tier, position });
        Ok(())
    }

    /// Weighted draw over every tier with a positive spawn weight.
    pub fn choose_tier(&mut self, catalog: &TierCatalog) -> Tier {
        let spawnable: Vec<(Tier, f64)> = catalog.spawnable().collect();
        let total: f64 = spawnable.iter().map(|(_, weight)| weight).sum();
        let threshold = self.source.next_unit() * total;

        let mut cumulative = 0.0;
        for (tier, weight) in &spawnable {
            cumulative += weight;
            if threshold < cumulative {
                return *tier;
            }
        }

        // Rounding can leave the threshold at the very top of the range.
        spawnable
            .last()
            .map_or(Tier::LOWEST, |(tier, _)| *tier)
    }

    /// Picks a placement, `None` when no grid cell is free.
    pub fn choose_position(&mut self, vacancy: &Vacancy) -> Option<Position> {
        match vacancy {
            Vacancy::Cells(cells) => {
                if cells.is_empty() {
                    return None;
                }
                let scaled = self.source.next_unit() * cells.len() as f64;
                let index = (scaled.floor() as usize).min(cells.len() - 1);
                Some(Position::Cell(cells[index]))
            }
            Vacancy::Area(bounds) => {
                let u = self.source.next_unit() as f32;
                let v = self.source.next_unit() as f32;
                Some(Position::Point(bounds.lerp(u, v)))
            }
        }
    }
}
