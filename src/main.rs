use std::fs;

use anyhow::Result;
use clap::Parser;
use engine::prelude::*;
use world::parse_map;

/// Run a scripted skirmish on a map and print what the engine computes.
#[derive(Parser, Debug)]
struct Args {
    /// ASCII map file, one level per blank-line separated block.
    map: Option<String>,

    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Mission darkness, 0 full day to 15 night.
    #[arg(long, default_value_t = 0)]
    shade: i32,
}

const DEMO_MAP: &str = "\
..........
.A...|....
.....|..b.
.....+....
..*..|....
..........";

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();
    let args = Args::parse();
    log::info!("battlefield seed {}", args.seed);

    let levels: Vec<String> = match &args.map {
        Some(path) => fs::read_to_string(path)?
            .split("\n\n")
            .map(str::to_string)
            .collect(),
        None => vec![DEMO_MAP.to_string()],
    };
    let level_refs: Vec<&str> = levels.iter().map(String::as_str).collect();
    let (mut field, markers) = parse_map(&level_refs, args.seed)?;
    field.global_shade = args.shade;

    // Spawn a unit on every letter marker: uppercase player side,
    // lowercase alien side.
    let mut roster: Vec<(char, UnitId)> = Vec::new();
    for (&c, &pos) in &markers {
        let faction = if c.is_ascii_uppercase() {
            Faction::Player
        } else {
            Faction::Alien
        };
        let id = field.spawn_unit(BattleUnit::new(c.to_string(), faction, pos));
        let rifle = field.rules.item_named("rifle").expect("standard content");
        let weapon = field.spawn_item(rifle, ItemOwner::None);
        field.equip_unit(id, weapon);
        roster.push((c, id));
    }

    let engine = TileEngine::default();
    engine.calculate_sun_shading(&mut field);
    engine.calculate_dynamic_lighting(&mut field);
    engine.recalculate_fov(&mut field);

    println!("light levels (z=0):");
    print_grid(&field, |field, pos| {
        let tile = field.tile(pos).expect("in bounds");
        if tile.is_empty_terrain() && tile.unit.is_none() {
            ' '
        } else {
            char::from_digit(tile.light() as u32, 16).unwrap_or('?')
        }
    });

    for &(c, id) in &roster {
        let unit = field.unit(id).expect("just spawned");
        let seen: Vec<String> = unit
            .visible_units
            .iter()
            .filter_map(|&other| field.unit(other))
            .map(|u| u.name.clone())
            .collect();
        println!(
            "{c} at {} sees {} tiles, units: [{}]",
            unit.pos,
            unit.visible_tiles.len(),
            seen.join(", ")
        );
        println!("view of {c} (z=0):");
        print_grid(&field, |_, pos| {
            if pos == unit.pos {
                c
            } else if unit.visible_tiles.contains(&pos) {
                '.'
            } else {
                ' '
            }
        });
    }

    // Let the first player unit take a shot at the first hostile it sees,
    // then walk into the open and eat the reaction fire.
    if let Some(&(c, shooter)) = roster
        .iter()
        .find(|(_, id)| {
            field.unit(*id).is_some_and(|u| {
                u.faction == Faction::Player && !u.visible_units.is_empty()
            })
        })
    {
        let target = *field
            .unit(shooter)
            .expect("just found")
            .visible_units
            .first()
            .expect("non-empty");
        let eye = engine
            .sight_origin_voxel(&field, field.unit(shooter).expect("found"));
        if let Some(aim) = engine.can_target_unit(&field, eye, target, Some(shooter))
        {
            println!("{c} snaps a shot");
            engine.hit(
                &mut field,
                aim,
                30,
                DamageType::ArmorPiercing,
                Some(shooter),
            );
            engine.check_reaction_fire(&mut field, shooter);
        }
    }

    // Crack open the powder barrel if the map has one.
    let barrel = field.positions().find(|&p| {
        field
            .part_def(p, PartKind::Object)
            .is_some_and(|d| d.explosive > 0)
    });
    if let Some(pos) = barrel {
        println!("demo grenade at {pos}");
        engine.explode(
            &mut field,
            pos,
            50,
            DamageType::HighExplosive,
            5,
            None,
        );
        engine.calculate_fov_around(&mut field, pos, 5);
    }

    // End of turn housekeeping.
    engine.tick_fuses(&mut field);
    engine.tick_terrain(&mut field, None);
    engine.close_doors(&mut field);
    field.end_turn_upkeep();
    engine.calculate_dynamic_lighting(&mut field);

    println!("smoke after the dust settles (z=0):");
    print_grid(&field, |field, pos| {
        let tile = field.tile(pos).expect("in bounds");
        match tile.smoke {
            0 => ' ',
            s => char::from_digit(s as u32, 16).unwrap_or('?'),
        }
    });

    Ok(())
}

fn print_grid(field: &Battlefield, cell: impl Fn(&Battlefield, Position) -> char) {
    let size = field.size();
    for y in 0..size.y {
        let row: String =
            (0..size.x).map(|x| cell(field, ivec3(x, y, 0))).collect();
        println!("  {row}");
    }
}
