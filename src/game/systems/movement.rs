//! Movement and collision resolution
//!
//! Every living snake moves "at once": verdicts are planned against an
//! occupancy snapshot taken before anyone moves, then committed. Because no
//! plan can observe another plan's result, the outcome depends on geometry
//! only, never on the order records come back from the store.

use hashbrown::HashSet;
use rayon::prelude::*;

use crate::game::state::{Fruit, Player};
use crate::util::grid::Cell;

/// Cells covered by living snakes before the tick moves anyone
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: HashSet<Cell>,
}

impl Occupancy {
    /// Capture the full body of every living player
    pub fn snapshot(players: &[Player]) -> Self {
        let cells = players
            .iter()
            .filter(|p| p.alive)
            .flat_map(|p| p.body.iter().copied())
            .collect();
        Self { cells }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}

/// Outcome of one snake's move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    /// Head would enter the snake's own body (tail excluded)
    SelfCollision { head: Cell },
    /// Head would enter a cell another living snake covered before the tick
    OtherCollision { head: Cell },
    /// Head moves into a free cell
    Clear { head: Cell },
}

impl MoveVerdict {
    pub fn is_collision(&self) -> bool {
        !matches!(self, MoveVerdict::Clear { .. })
    }
}

/// A planned move for the player at `index` of the planning input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub index: usize,
    pub verdict: MoveVerdict,
}

/// Current head stepped once along the player's direction, wrapped
pub fn next_head(player: &Player, width: u32, height: u32) -> Option<Cell> {
    player
        .head()
        .map(|head| head.step(player.direction, width, height))
}

/// Decide one player's move against the pre-tick occupancy.
///
/// The current tail is exempt on both checks: it vacates its cell as the
/// snake moves, so a snake may chase its own tail. Other snakes' tails get no
/// such exemption.
pub fn plan_move(
    player: &Player,
    occupancy: &Occupancy,
    width: u32,
    height: u32,
) -> Option<MoveVerdict> {
    let head = next_head(player, width, height)?;
    let tail = player.tail()?;
    let neck = &player.body[..player.body.len() - 1];

    if neck.contains(&head) {
        return Some(MoveVerdict::SelfCollision { head });
    }
    if occupancy.contains(head) && head != tail {
        return Some(MoveVerdict::OtherCollision { head });
    }
    Some(MoveVerdict::Clear { head })
}

/// Plan every living player's move in parallel from one frozen snapshot
pub fn plan_moves(players: &[Player], width: u32, height: u32) -> Vec<MovePlan> {
    let occupancy = Occupancy::snapshot(players);
    players
        .par_iter()
        .enumerate()
        .filter(|(_, p)| p.alive)
        .filter_map(|(index, p)| {
            plan_move(p, &occupancy, width, height).map(|verdict| MovePlan { index, verdict })
        })
        .collect()
}

/// New body after a clear move: head prepended, tail dropped unless growing
pub fn advance_body(body: &[Cell], head: Cell, grow: bool) -> Vec<Cell> {
    let keep = if grow {
        body.len()
    } else {
        body.len().saturating_sub(1)
    };
    let mut next = Vec::with_capacity(keep + 1);
    next.push(head);
    next.extend_from_slice(&body[..keep]);
    next
}

/// Remove and return the first not-yet-eaten fruit on `cell`
pub fn take_fruit_at(fruits: &mut Vec<Fruit>, cell: Cell) -> Option<Fruit> {
    let pos = fruits.iter().position(|f| f.cell() == cell)?;
    Some(fruits.remove(pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::NewFruit;
    use crate::net::session::SessionId;
    use crate::util::grid::Direction;

    fn snake(id: &str, body: &[(i32, i32)], direction: Direction) -> Player {
        let mut p = Player::spawn(
            SessionId::new(id),
            id.into(),
            "#fff".into(),
            Cell::new(body[0].0, body[0].1),
            direction,
            false,
            0,
        );
        p.body = body.iter().map(|&(x, y)| Cell::new(x, y)).collect();
        p
    }

    #[test]
    fn test_next_head_wraps() {
        let p = snake("a", &[(39, 0)], Direction::Right);
        assert_eq!(next_head(&p, 40, 28), Some(Cell::new(0, 0)));
        let p = snake("a", &[(0, 0)], Direction::Up);
        assert_eq!(next_head(&p, 40, 28), Some(Cell::new(0, 27)));
    }

    #[test]
    fn test_straight_move_is_clear() {
        let p = snake("a", &[(5, 5), (4, 5), (3, 5)], Direction::Right);
        let occ = Occupancy::snapshot(std::slice::from_ref(&p));
        assert_eq!(
            plan_move(&p, &occ, 20, 20),
            Some(MoveVerdict::Clear { head: Cell::new(6, 5) })
        );
    }

    #[test]
    fn test_turning_onto_own_neck_is_self_collision() {
        // Reversal cannot be requested, but a stale direction can still point at the neck
        let p = snake("a", &[(5, 5), (4, 5), (3, 5)], Direction::Left);
        let occ = Occupancy::snapshot(std::slice::from_ref(&p));
        assert_eq!(
            plan_move(&p, &occ, 20, 20),
            Some(MoveVerdict::SelfCollision { head: Cell::new(4, 5) })
        );
    }

    #[test]
    fn test_following_own_tail_is_allowed() {
        // 2x2 loop: head (5,5) moving up lands on the departing tail (5,4)
        let p = snake("a", &[(5, 5), (6, 5), (6, 4), (5, 4)], Direction::Up);
        let occ = Occupancy::snapshot(std::slice::from_ref(&p));
        assert_eq!(
            plan_move(&p, &occ, 20, 20),
            Some(MoveVerdict::Clear { head: Cell::new(5, 4) })
        );
    }

    #[test]
    fn test_curling_into_own_body_is_self_collision() {
        let p = snake(
            "a",
            &[(5, 5), (6, 5), (6, 4), (5, 4), (4, 4)],
            Direction::Up,
        );
        let occ = Occupancy::snapshot(std::slice::from_ref(&p));
        assert!(matches!(
            plan_move(&p, &occ, 20, 20),
            Some(MoveVerdict::SelfCollision { .. })
        ));
    }

    #[test]
    fn test_other_snakes_tail_is_not_exempt() {
        let mover = snake("a", &[(4, 5)], Direction::Right);
        let other = snake("b", &[(5, 6), (5, 5)], Direction::Down);
        let players = vec![mover, other];
        let plans = plan_moves(&players, 20, 20);
        let verdict = plans.iter().find(|p| p.index == 0).unwrap().verdict;
        assert_eq!(verdict, MoveVerdict::OtherCollision { head: Cell::new(5, 5) });
    }

    #[test]
    fn test_dead_bodies_are_not_obstacles() {
        let mover = snake("a", &[(4, 5)], Direction::Right);
        let mut corpse = snake("b", &[(5, 5), (5, 4)], Direction::Down);
        corpse.alive = false;
        let players = vec![mover, corpse];
        let plans = plan_moves(&players, 20, 20);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].verdict, MoveVerdict::Clear { head: Cell::new(5, 5) });
    }

    #[test]
    fn test_head_on_swap_is_order_independent() {
        // Adjacent heads moving into each other: both land on a pre-tick body cell
        let a = snake("a", &[(4, 5), (3, 5)], Direction::Right);
        let b = snake("b", &[(5, 5), (6, 5)], Direction::Left);

        let forward = plan_moves(&[a.clone(), b.clone()], 20, 20);
        let backward = plan_moves(&[b, a], 20, 20);
        assert!(forward.iter().all(|p| p.verdict.is_collision()));
        assert!(backward.iter().all(|p| p.verdict.is_collision()));
    }

    #[test]
    fn test_heads_meeting_in_empty_cell_both_move() {
        let a = snake("a", &[(4, 5)], Direction::Right);
        let b = snake("b", &[(6, 5)], Direction::Left);
        let plans = plan_moves(&[a, b], 20, 20);
        assert_eq!(plans.len(), 2);
        assert!(plans
            .iter()
            .all(|p| p.verdict == MoveVerdict::Clear { head: Cell::new(5, 5) }));
    }

    #[test]
    fn test_advance_body_without_growth_keeps_length() {
        let body = vec![Cell::new(5, 5), Cell::new(4, 5), Cell::new(3, 5)];
        let next = advance_body(&body, Cell::new(6, 5), false);
        assert_eq!(next, vec![Cell::new(6, 5), Cell::new(5, 5), Cell::new(4, 5)]);
    }

    #[test]
    fn test_advance_body_with_growth_adds_segment() {
        let body = vec![Cell::new(5, 5)];
        let next = advance_body(&body, Cell::new(6, 5), true);
        assert_eq!(next, vec![Cell::new(6, 5), Cell::new(5, 5)]);
    }

    #[test]
    fn test_take_fruit_at_consumes_once() {
        let mut fruits = vec![
            NewFruit {
                cell: Cell::new(6, 5),
                spawned_at: 0,
                is_super: false,
            }
            .with_id(1),
            NewFruit {
                cell: Cell::new(1, 1),
                spawned_at: 0,
                is_super: false,
            }
            .with_id(2),
        ];
        assert_eq!(take_fruit_at(&mut fruits, Cell::new(6, 5)).map(|f| f.id), Some(1));
        assert!(take_fruit_at(&mut fruits, Cell::new(6, 5)).is_none());
        assert_eq!(fruits.len(), 1);
    }
}
