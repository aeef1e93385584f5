//! Plain-text views of a running session.

use std::fmt::Write as _;

use merge_forge_core::{Layout, Mission, Position};
use merge_forge_session::Session;
use merge_forge_world::query;

/// Draws the board: a rank grid for grid sessions, an entity list otherwise.
pub(crate) fn board(session: &Session) -> String {
    let world = session.world();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "score {}  highest tier {}  entities {}",
        session.score(),
        session.highest_tier().rank(),
        query::entity_count(world)
    );

    match query::layout(world) {
        Layout::Grid { .. } => {
            let occupancy = query::occupancy_view(world);
            let (columns, _) = occupancy.dimensions();
            for (index, occupant) in occupancy.iter().enumerate() {
                let cell = match occupant.and_then(|id| query::entity(world, id)) {
                    Some(entity) if Some(entity.id) == session.selection() => {
                        format!("[{}]", entity.tier.rank())
                    }
                    Some(entity) => format!(" {} ", entity.tier.rank()),
                    None => " . ".to_owned(),
                };
                out.push_str(&cell);
                if columns > 0 && (index as u32 + 1) % columns == 0 {
                    out.push('\n');
                }
            }
        }
        Layout::Floating { .. } => {
            for entity in query::entity_view(world).iter() {
                if let Position::Point(point) = entity.position {
                    let _ = writeln!(
                        out,
                        "#{:<4} tier {} at ({:.1}, {:.1})",
                        entity.id.get(),
                        entity.tier.rank(),
                        point.x,
                        point.y
                    );
                }
            }
        }
    }
    out
}

/// Lists missions with their progress and claim state.
pub(crate) fn missions(missions: &[Mission]) -> String {
    let mut out = String::new();
    for mission in missions {
        let state = if mission.progress.claimed {
            "claimed"
        } else if mission.progress.completed {
            "ready to claim"
        } else {
            "in progress"
        };
        let _ = writeln!(
            out,
            "{:<10} {:<22} {}/{}  {}",
            mission.id(),
            mission.definition.title,
            mission.progress.current_count,
            mission.definition.target_count,
            state
        );
    }
    out
}
