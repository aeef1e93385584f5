//! Line commands accepted by the interactive driver.

use anyhow::{bail, Context, Result};
use merge_forge_core::{CellCoord, EntityId, MissionId, Point};

/// One parsed line of player input.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Input {
    Click(CellCoord),
    Drag { entity: EntityId, to: Point },
    Spawn,
    Undo,
    Reset,
    Claim(MissionId),
    Tick(u64),
    Board,
    Missions,
    Save,
    Help,
    Quit,
}

pub(crate) const HELP: &str = "\
commands:
  click ROW COLUMN   select, move or merge on the grid
  drag ID X Y        drag an entity to a point and release it
  spawn              spawn one entity
  undo               revert the last move
  reset              start over
  claim ID           claim a completed mission (e.g. 1 or mission_1)
  tick MS            advance timers
  board | missions   print state
  save               save now
  quit";

impl Input {
    /// Parses a single line. Blank lines yield `None`.
    pub(crate) fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let arguments: Vec<&str> = words.collect();

        let input = match (keyword.to_ascii_lowercase().as_str(), arguments.as_slice()) {
            ("click", [row, column]) => Self::Click(CellCoord::new(
                number(column, "column")?,
                number(row, "row")?,
            )),
            ("drag", [id, x, y]) => Self::Drag {
                entity: EntityId::new(number(id, "entity id")?),
                to: Point::new(coordinate(x)?, coordinate(y)?),
            },
            ("spawn", []) => Self::Spawn,
            ("undo", []) => Self::Undo,
            ("reset", []) => Self::Reset,
            ("claim", [id]) => {
                let digits = id.strip_prefix("mission_").unwrap_or(*id);
                Self::Claim(MissionId::new(number(digits, "mission id")?))
            }
            ("tick", [millis]) => Self::Tick(number(millis, "milliseconds")?),
            ("board", []) => Self::Board,
            ("missions", []) => Self::Missions,
            ("save", []) => Self::Save,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            (other, _) => bail!("unrecognised command `{other}`; type `help`"),
        };
        Ok(Some(input))
    }
}

fn number<T: std::str::FromStr>(word: &str, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    word.parse()
        .with_context(|| format!("`{word}` is not a valid {what}"))
}

fn coordinate(word: &str) -> Result<f32> {
    let value: f32 = number(word, "coordinate")?;
    if !value.is_finite() {
        bail!("coordinate `{word}` must be finite");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_takes_row_then_column() {
        assert_eq!(
            Input::parse("click 3 1").expect("valid"),
            Some(Input::Click(CellCoord::new(1, 3)))
        );
    }

    #[test]
    fn claim_accepts_both_spellings() {
        for line in ["claim 2", "claim mission_2"] {
            assert_eq!(
                Input::parse(line).expect("valid"),
                Some(Input::Claim(MissionId::new(2)))
            );
        }
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(Input::parse("   ").expect("blank"), None);
        assert!(Input::parse("click 1").is_err());
        assert!(Input::parse("drag 1 x 2").is_err());
        assert!(Input::parse("fly").is_err());
        assert!(Input::parse("drag 0 NaN 1").is_err());
    }

    #[test]
    fn drag_parses_points() {
        assert_eq!(
            Input::parse("DRAG 4 120.5 80").expect("valid"),
            Some(Input::Drag {
                entity: EntityId::new(4),
                to: Point::new(120.5, 80.0),
            })
        );
    }
}
