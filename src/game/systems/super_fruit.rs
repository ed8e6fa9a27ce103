use crate::game::state::Player;

/// Nearest living rival of `invoker` by toroidal squared distance between heads.
///
/// Ties go to the rival that comes first in `players`.
pub fn nearest_rival<'a>(
    invoker: &Player,
    players: &'a [Player],
    width: u32,
    height: u32,
) -> Option<&'a Player> {
    let origin = invoker.head()?;
    players
        .iter()
        .filter(|p| p.alive && p.session_id != invoker.session_id)
        .filter_map(|p| {
            p.head()
                .map(|head| (origin.toroidal_distance_sq(head, width, height), p))
        })
        // first of equal minima wins
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, p)| p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::session::SessionId;
    use crate::util::grid::{Cell, Direction};

    fn at(id: &str, x: i32, y: i32) -> Player {
        Player::spawn(
            SessionId::new(id),
            id.into(),
            "#fff".into(),
            Cell::new(x, y),
            Direction::Right,
            false,
            0,
        )
    }

    #[test]
    fn test_wraparound_rival_is_nearest() {
        let me = at("me", 0, 0);
        let players = vec![me.clone(), at("far", 2, 2), at("wrap", 9, 9)];
        let target = nearest_rival(&me, &players, 10, 10).unwrap();
        assert_eq!(target.session_id.as_str(), "wrap");
    }

    #[test]
    fn test_ties_pick_first_in_order() {
        let me = at("me", 5, 5);
        let players = vec![at("left", 4, 5), me.clone(), at("right", 6, 5)];
        let target = nearest_rival(&me, &players, 20, 20).unwrap();
        assert_eq!(target.session_id.as_str(), "left");
    }

    #[test]
    fn test_dead_and_self_are_skipped() {
        let me = at("me", 0, 0);
        let mut dead = at("dead", 1, 0);
        dead.alive = false;
        let players = vec![me.clone(), dead];
        assert!(nearest_rival(&me, &players, 10, 10).is_none());
    }
}
