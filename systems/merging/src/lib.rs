#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure merge evaluation shared by the world and the session's drag preview.
//!
//! Eligibility is "same tier and neighbours", where the neighbour relation is
//! 4-adjacency on a grid and a proximity radius in floating space. Nothing in
//! this crate mutates state; the world consumes [`MergePlan`] values and
//! allocates identifiers itself.

use merge_forge_core::{
    CellCoord, EntitySnapshot, Layout, MoveRejection, Position, Tier, TierCatalog,
};

/// Neighbour relation derived from the board layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Neighborhood {
    /// Cells must share an edge.
    Adjacent,
    /// Points must lie within the radius of each other.
    Radius(f32),
}

impl Neighborhood {
    /// Derives the neighbour relation for the layout.
    #[must_use]
    pub fn for_layout(layout: &Layout) -> Self {
        match layout {
            Layout::Grid { .. } => Self::Adjacent,
            Layout::Floating { merge_radius, .. } => Self::Radius(*merge_radius),
        }
    }

    /// Reports whether the two positions are neighbours. Mixed kinds never are.
    #[must_use]
    pub fn holds(&self, a: Position, b: Position) -> bool {
        match (self, a, b) {
            (Self::Adjacent, Position::Cell(a), Position::Cell(b)) => a.is_adjacent(b),
            (Self::Radius(radius), Position::Point(a), Position::Point(b)) => {
                a.distance(b) <= *radius
            }
            _ => false,
        }
    }
}

/// Outcome of resolving an eligible pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergePlan {
    /// Tier of the produced entity.
    pub tier: Tier,
    /// Position of the produced entity.
    pub position: Position,
    /// Points the merge adds to the score.
    pub value: u64,
}

/// Reports whether two distinct entities may merge.
#[must_use]
pub fn eligible(a: &EntitySnapshot, b: &EntitySnapshot, neighborhood: Neighborhood) -> bool {
    a.id != b.id && a.tier == b.tier && neighborhood.holds(a.position, b.position)
}

/// Resolves an eligible pair into the entity it produces.
///
/// `moved` is the entity the player moved onto `target`. On a grid the result
/// takes the target's cell; in floating space it lands on the midpoint. Returns
/// `None` when the tier has no successor, in which case the pair must be left
/// untouched.
#[must_use]
pub fn resolve(
    moved: &EntitySnapshot,
    target: &EntitySnapshot,
    catalog: &TierCatalog,
) -> Option<MergePlan> {
    let tier = catalog.next_tier(moved.tier)?;
    let position = match (moved.position, target.position) {
        (Position::Point(a), Position::Point(b)) => Position::Point(a.midpoint(b)),
        (_, target_position) => target_position,
    };
    Some(MergePlan {
        tier,
        position,
        value: catalog.value_of(tier),
    })
}

/// Checks eligibility and resolves the pair, naming the first failed rule.
pub fn plan_merge(
    moved: &EntitySnapshot,
    target: &EntitySnapshot,
    catalog: &TierCatalog,
    neighborhood: Neighborhood,
) -> Result<MergePlan, MoveRejection> {
    if moved.id == target.id {
        return Err(MoveRejection::SameEntity);
    }
    if moved.tier != target.tier {
        return Err(MoveRejection::NotEligible);
    }
    if !neighborhood.holds(moved.position, target.position) {
        return Err(MoveRejection::NotNeighbor);
    }
    resolve(moved, target, catalog).ok_or(MoveRejection::MaxTier)
}

/// Finds the closest same-tier partner within `radius` of the dragged entity.
///
/// The dragged snapshot carries its current drag position. Ties are broken by
/// the lower identifier so previews and commits agree.
pub fn find_merge_target<'a, I>(
    dragged: &EntitySnapshot,
    candidates: I,
    radius: f32,
) -> Option<&'a EntitySnapshot>
where
    I: IntoIterator<Item = &'a EntitySnapshot>,
{
    let Position::Point(origin) = dragged.position else {
        return None;
    };

    let mut best: Option<(&EntitySnapshot, f32)> = None;
    for candidate in candidates {
        if candidate.id == dragged.id || candidate.tier != dragged.tier {
            continue;
        }
        let Position::Point(point) = candidate.position else {
            continue;
        };
        let distance = origin.distance(point);
        if distance > radius {
            continue;
        }
        let closer = match best {
            None => true,
            Some((current, best_distance)) => {
                distance < best_distance || (distance == best_distance && candidate.id < current.id)
            }
        };
        if closer {
            best = Some((candidate, distance));
        }
    }

    best.map(|(snapshot, _)| snapshot)
}

/// Reports whether any two edge-sharing cells hold the same tier.
///
/// Only right and down neighbours are inspected so each pair is visited once.
pub fn has_adjacent_pair<F>(columns: u32, rows: u32, tier_at: F) -> bool
where
    F: Fn(CellCoord) -> Option<Tier>,
{
    for row in 0..rows {
        for column in 0..columns {
            let Some(tier) = tier_at(CellCoord::new(column, row)) else {
                continue;
            };
            let right = CellCoord::new(column + 1, row);
            let down = CellCoord::new(column, row + 1);
            if (column + 1 < columns && tier_at(right) == Some(tier))
                || (row + 1 < rows && tier_at(down) == Some(tier))
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_forge_core::{EntityId, Point};

    fn cell_entity(id: u64, rank: u8, column: u32, row: u32) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            tier: Tier::new(rank),
            position: Position::Cell(CellCoord::new(column, row)),
            fresh: false,
        }
    }

    fn point_entity(id: u64, rank: u8, x: f32, y: f32) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            tier: Tier::new(rank),
            position: Position::Point(Point::new(x, y)),
            fresh: false,
        }
    }

    #[test]
    fn adjacency_requires_shared_edge() {
        let a = cell_entity(1, 1, 2, 2);
        assert!(eligible(&a, &cell_entity(2, 1, 3, 2), Neighborhood::Adjacent));
        assert!(!eligible(&a, &cell_entity(2, 1, 3, 3), Neighborhood::Adjacent));
        assert!(!eligible(&a, &cell_entity(2, 2, 3, 2), Neighborhood::Adjacent));
        assert!(!eligible(&a, &a, Neighborhood::Adjacent));
    }

    #[test]
    fn radius_includes_its_boundary() {
        let a = point_entity(1, 1, 0.0, 0.0);
        assert!(eligible(&a, &point_entity(2, 1, 80.0, 0.0), Neighborhood::Radius(80.0)));
        assert!(!eligible(&a, &point_entity(2, 1, 80.5, 0.0), Neighborhood::Radius(80.0)));
    }

    #[test]
    fn grid_merge_lands_on_target_cell() {
        let catalog = TierCatalog::forge();
        let plan = plan_merge(
            &cell_entity(1, 1, 2, 2),
            &cell_entity(2, 1, 3, 2),
            &catalog,
            Neighborhood::Adjacent,
        )
        .expect("eligible pair");
        assert_eq!(plan.tier, Tier::new(2));
        assert_eq!(plan.position, Position::Cell(CellCoord::new(3, 2)));
        assert_eq!(plan.value, 25);
    }

    #[test]
    fn floating_merge_lands_on_midpoint() {
        let catalog = TierCatalog::salvage();
        let plan = plan_merge(
            &point_entity(1, 1, 100.0, 100.0),
            &point_entity(2, 1, 130.0, 100.0),
            &catalog,
            Neighborhood::Radius(80.0),
        )
        .expect("eligible pair");
        assert_eq!(plan.position, Position::Point(Point::new(115.0, 100.0)));
    }

    #[test]
    fn plan_names_first_failed_rule() {
        let catalog = TierCatalog::forge();
        let max = catalog.max_tier().rank();
        let rule = Neighborhood::Adjacent;
        let a = cell_entity(1, 1, 0, 0);
        assert_eq!(
            plan_merge(&a, &a, &catalog, rule),
            Err(MoveRejection::SameEntity)
        );
        assert_eq!(
            plan_merge(&a, &cell_entity(2, 2, 1, 0), &catalog, rule),
            Err(MoveRejection::NotEligible)
        );
        assert_eq!(
            plan_merge(&a, &cell_entity(2, 1, 4, 4), &catalog, rule),
            Err(MoveRejection::NotNeighbor)
        );
        assert_eq!(
            plan_merge(
                &cell_entity(1, max, 0, 0),
                &cell_entity(2, max, 1, 0),
                &catalog,
                rule
            ),
            Err(MoveRejection::MaxTier)
        );
    }

    #[test]
    fn target_search_prefers_nearest_then_lowest_id() {
        let dragged = point_entity(1, 1, 100.0, 100.0);
        let candidates = [
            point_entity(5, 1, 150.0, 100.0),
            point_entity(4, 1, 50.0, 100.0),
            point_entity(3, 1, 120.0, 100.0),
            point_entity(2, 2, 101.0, 100.0),
            point_entity(6, 1, 300.0, 100.0),
        ];
        let found = find_merge_target(&dragged, candidates.iter(), 80.0).map(|s| s.id);
        assert_eq!(found, Some(EntityId::new(3)));

        let tied = [point_entity(9, 1, 110.0, 100.0), point_entity(8, 1, 90.0, 100.0)];
        let found = find_merge_target(&dragged, tied.iter(), 80.0).map(|s| s.id);
        assert_eq!(found, Some(EntityId::new(8)));
    }

    #[test]
    fn target_search_ignores_self_and_far_entities() {
        let dragged = point_entity(1, 1, 100.0, 100.0);
        let candidates = [dragged, point_entity(2, 1, 400.0, 400.0)];
        assert!(find_merge_target(&dragged, candidates.iter(), 80.0).is_none());
    }

    #[test]
    fn adjacent_pair_scan_checks_both_axes() {
        let horizontal = |cell: CellCoord| match (cell.column(), cell.row()) {
            (0, 0) | (1, 0) => Some(Tier::new(1)),
            _ => None,
        };
        assert!(has_adjacent_pair(2, 2, horizontal));

        let vertical = |cell: CellCoord| match (cell.column(), cell.row()) {
            (1, 0) | (1, 1) => Some(Tier::new(3)),
            _ => None,
        };
        assert!(has_adjacent_pair(2, 2, vertical));

        let diagonal = |cell: CellCoord| match (cell.column(), cell.row()) {
            (0, 0) | (1, 1) => Some(Tier::new(1)),
            (1, 0) | (0, 1) => Some(Tier::new(2)),
            _ => None,
        };
        assert!(!has_adjacent_pair(2, 2, diagonal));
    }
}
