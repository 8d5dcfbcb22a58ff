//! ASCII battlefield descriptions for tests and the demo driver.

use anyhow::{bail, Context, Result};
use glam::ivec3;
use util::IndexMap;

use crate::{
    battlefield::Battlefield, part::PartKind, position::Position,
    part::Ruleset,
};

/// Build a battlefield from one ASCII map per z level, ground level first.
///
/// Terrain legend:
///
/// ```notrust
/// .  floor                #  solid block (floor + full-height object)
/// |  west wall            -  north wall
/// +  door (north wall)    =  sliding door (north wall)
/// ^  window (north wall)  *  explosive barrel
/// %  lamp                 ~  smoke-filled floor
/// !  burning floor        (space)  void, no floor
/// ```
///
/// Letters stand on a plain floor tile and are returned as marker positions
/// for the caller to place units or items on.
///
/// Unknown characters are a content error and fail the whole parse.
pub fn parse_map(
    levels: &[&str],
    seed: u64,
) -> Result<(Battlefield, IndexMap<char, Position>)> {
    let rules = Ruleset::standard();
    rules.validate()?;

    let grids: Vec<Vec<&str>> = levels
        .iter()
        .map(|level| {
            level
                .lines()
                .map(str::trim_end)
                .skip_while(|line| line.is_empty())
                .collect()
        })
        .collect();

    let width = grids
        .iter()
        .flatten()
        .map(|line| line.chars().count())
        .max()
        .context("empty map")? as i32;
    let height = grids.iter().map(Vec::len).max().context("empty map")? as i32;
    if width == 0 || height == 0 {
        bail!("empty map");
    }

    let mut field = Battlefield::new(
        ivec3(width, height, levels.len() as i32),
        rules,
        seed,
    );
    let mut markers = IndexMap::default();

    for (z, grid) in grids.iter().enumerate() {
        for (y, line) in grid.iter().enumerate() {
            for (x, c) in line.chars().enumerate() {
                let pos = ivec3(x as i32, y as i32, z as i32);
                apply_char(&mut field, &mut markers, pos, c)?;
            }
        }
    }

    Ok((field, markers))
}

fn apply_char(
    field: &mut Battlefield,
    markers: &mut IndexMap<char, Position>,
    pos: Position,
    c: char,
) -> Result<()> {
    let part = |name: &str| {
        field
            .rules
            .part_named(name)
            .expect("standard ruleset part missing")
    };

    let floor = part("floor");
    let (floor_part, wall, object) = match c {
        ' ' => (None, None, None),
        '.' => (Some(floor), None, None),
        '#' => (Some(floor), None, Some(part("block"))),
        '|' => (Some(floor), Some((PartKind::WestWall, part("wall"))), None),
        '-' => (Some(floor), Some((PartKind::NorthWall, part("wall"))), None),
        '+' => (Some(floor), Some((PartKind::NorthWall, part("door"))), None),
        '=' => (
            Some(floor),
            Some((PartKind::NorthWall, part("sliding-door"))),
            None,
        ),
        '^' => (Some(floor), Some((PartKind::NorthWall, part("window"))), None),
        '*' => (Some(floor), None, Some(part("barrel"))),
        '%' => (Some(floor), None, Some(part("lamp"))),
        '~' | '!' => (Some(floor), None, None),
        c if c.is_ascii_alphabetic() => {
            if markers.insert(c, pos).is_some() {
                bail!("duplicate marker {c:?} at {pos}");
            }
            (Some(floor), None, None)
        }
        c => bail!("unknown map character {c:?} at {pos}"),
    };

    let tile = field.tile_mut(pos).expect("parser stays in bounds");
    tile.set_part(PartKind::Floor, floor_part);
    if let Some((kind, id)) = wall {
        tile.set_part(kind, Some(id));
    }
    tile.set_part(PartKind::Object, object);

    match c {
        '~' => tile.add_smoke(10),
        '!' => tile.ignite(3),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_simple_map() {
        let (field, markers) = parse_map(
            &[r#"
######
#A...#
#..+.#
#...B#
######
"#],
            1,
        )
        .unwrap();

        assert_eq!(field.size(), ivec3(6, 5, 1));
        assert_eq!(markers.get(&'A'), Some(&ivec3(1, 1, 0)));
        assert_eq!(markers.get(&'B'), Some(&ivec3(4, 3, 0)));

        let wall = field.part_def(ivec3(0, 0, 0), PartKind::Object).unwrap();
        assert_eq!(wall.name, "block");
        let door = field
            .part_def(ivec3(3, 2, 0), PartKind::NorthWall)
            .unwrap();
        assert!(door.is_door);
        assert!(field.has_floor(ivec3(2, 2, 0)));
    }

    #[test]
    fn parse_rejects_unknown_characters() {
        assert!(parse_map(&["..?.."], 1).is_err());
    }

    #[test]
    fn parse_multi_level() {
        let (field, _) = parse_map(
            &[
                "....\n....",
                "##  \n##  ",
            ],
            1,
        )
        .unwrap();
        assert_eq!(field.size(), ivec3(4, 2, 2));
        assert!(field.has_floor(ivec3(0, 0, 1)));
        assert!(!field.has_floor(ivec3(3, 0, 1)));
    }
}
