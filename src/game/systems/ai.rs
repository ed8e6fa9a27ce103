use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

use crate::game::constants::bot::TURN_PROBABILITY;
use crate::util::grid::Direction;

/// Headings a snake may take without reversing onto its neck
pub fn turn_options(current: Direction) -> SmallVec<[Direction; 3]> {
    Direction::ALL
        .into_iter()
        .filter(|d| !d.is_reverse_of(current))
        .collect()
}

/// Roll a bot's turn for this tick.
///
/// `current` is the heading the bot moved with this tick. Returns `None` when
/// the bot keeps going straight this tick. The chosen heading may equal
/// `current`, which is just as much a "turn" as far as the roll is concerned.
pub fn decide_turn<R: Rng + ?Sized>(rng: &mut R, current: Direction) -> Option<Direction> {
    if !rng.gen_bool(TURN_PROBABILITY) {
        return None;
    }
    turn_options(current).choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_turn_options_exclude_reverse() {
        for dir in Direction::ALL {
            let options = turn_options(dir);
            assert_eq!(options.len(), 3);
            assert!(options.contains(&dir));
            assert!(!options.contains(&dir.opposite()));
        }
    }

    #[test]
    fn test_decide_turn_never_reverses() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2_000 {
            for dir in Direction::ALL {
                if let Some(next) = decide_turn(&mut rng, dir) {
                    assert!(!next.is_reverse_of(dir));
                }
            }
        }
    }

    #[test]
    fn test_decide_turn_rate() {
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 20_000;
        let turned = (0..trials)
            .filter(|_| decide_turn(&mut rng, Direction::Right).is_some())
            .count();
        let rate = turned as f64 / trials as f64;
        assert!((0.22..0.28).contains(&rate), "turn rate {}", rate);
    }
}
