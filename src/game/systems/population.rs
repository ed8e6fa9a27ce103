//! Population policy
//!
//! Decides how many fruits and bots the world should hold and produces the
//! random placements for new entities. Nothing in here touches the store.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::clock::Millis;
use crate::game::constants::{player, population, super_fruit};
use crate::game::state::{NewFruit, Player, WorldConfig};
use crate::util::grid::{Cell, Direction};

/// Fruit target for a given player count, capped by the playfield size
pub fn desired_fruit_count(player_count: usize, cell_count: usize) -> usize {
    let desired = population::FRUIT_STEPS
        .iter()
        .find(|(upper, _)| player_count <= *upper)
        .map(|(_, fruits)| *fruits)
        .unwrap_or(population::FRUIT_CEILING);
    desired.min(cell_count)
}

/// Fruits to spawn this tick. Excess fruit is never removed.
pub fn fruit_deficit(player_count: usize, fruit_count: usize, cell_count: usize) -> usize {
    desired_fruit_count(player_count, cell_count).saturating_sub(fruit_count)
}

/// Bots to spawn this tick. Dead bots still count until they are pruned.
pub fn bot_deficit(target_bots: u32, bot_count: usize) -> usize {
    (target_bots as usize).saturating_sub(bot_count)
}

/// Players whose last heartbeat is older than the inactivity window
pub fn inactive<'a>(players: &'a [Player], now: Millis) -> impl Iterator<Item = &'a Player> + 'a {
    players.iter().filter(move |p| p.is_inactive(now))
}

pub fn random_cell<R: Rng + ?Sized>(rng: &mut R, config: &WorldConfig) -> Cell {
    Cell::new(
        rng.gen_range(0..config.grid_width) as i32,
        rng.gen_range(0..config.grid_height) as i32,
    )
}

pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    player::PALETTE
        .choose(rng)
        .copied()
        .unwrap_or(player::PALETTE[0])
        .to_string()
}

/// A fruit at a uniformly random cell. May land on a snake.
pub fn random_fruit<R: Rng + ?Sized>(rng: &mut R, config: &WorldConfig, now: Millis) -> NewFruit {
    NewFruit {
        cell: random_cell(rng, config),
        spawned_at: now,
        is_super: rng.gen_bool(super_fruit::SPAWN_CHANCE),
    }
}

/// Trimmed display name, cut to the length limit, defaulted when blank
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return player::DEFAULT_NAME.to_string();
    }
    trimmed.chars().take(player::MAX_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldDefaults;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_desired_fruit_table() {
        let cells = 40 * 28;
        assert_eq!(desired_fruit_count(0, cells), 1);
        assert_eq!(desired_fruit_count(1, cells), 2);
        assert_eq!(desired_fruit_count(3, cells), 2);
        assert_eq!(desired_fruit_count(4, cells), 4);
        assert_eq!(desired_fruit_count(10, cells), 4);
        assert_eq!(desired_fruit_count(11, cells), 5);
        assert_eq!(desired_fruit_count(500, cells), 5);
    }

    #[test]
    fn test_desired_fruit_is_monotonic_and_capped() {
        for cells in [1, 2, 3, 64, 1_120] {
            let mut previous = 0;
            for players in 0..50 {
                let desired = desired_fruit_count(players, cells);
                assert!(desired >= previous);
                assert!(desired <= cells);
                previous = desired;
            }
        }
    }

    #[test]
    fn test_fruit_deficit_never_negative() {
        assert_eq!(fruit_deficit(0, 0, 100), 1);
        assert_eq!(fruit_deficit(5, 1, 100), 3);
        assert_eq!(fruit_deficit(0, 9, 100), 0);
    }

    #[test]
    fn test_bot_deficit() {
        assert_eq!(bot_deficit(3, 0), 3);
        assert_eq!(bot_deficit(3, 2), 1);
        assert_eq!(bot_deficit(3, 5), 0);
        assert_eq!(bot_deficit(0, 0), 0);
    }

    #[test]
    fn test_random_cells_stay_on_grid() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut config = WorldConfig::from_defaults(&WorldDefaults::default(), 0);
        config.grid_width = 9;
        config.grid_height = 8;
        for _ in 0..1_000 {
            let c = random_cell(&mut rng, &config);
            assert!((0..9).contains(&c.x));
            assert!((0..8).contains(&c.y));
        }
    }

    #[test]
    fn test_super_fruit_is_rare() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = WorldConfig::from_defaults(&WorldDefaults::default(), 0);
        let supers = (0..10_000)
            .filter(|_| random_fruit(&mut rng, &config, 0).is_super)
            .count();
        assert!((800..1_200).contains(&supers), "supers {}", supers);
    }

    #[test]
    fn test_random_color_from_palette() {
        let mut rng = StdRng::seed_from_u64(5);
        let color = random_color(&mut rng);
        assert!(player::PALETTE.contains(&color.as_str()));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Alice  "), "Alice");
        assert_eq!(sanitize_name("   "), "Anonymous");
        assert_eq!(sanitize_name(&"x".repeat(40)).len(), 20);
        assert_eq!(sanitize_name("ééééééééééééééééééééééé").chars().count(), 20);
    }
}
