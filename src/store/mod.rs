//! World store contract
//!
//! The engine never holds world data between calls. Every operation reads
//! what it needs from a [`WorldStore`] and writes back record by record. A
//! store guarantees atomicity per record only: nothing here spans several
//! players or fruits, apart from the bulk clears used by admin operations.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::game::clock::Millis;
use crate::game::state::{Fruit, FruitId, NewFruit, Player, WorldConfig};
use crate::net::session::SessionId;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub trait WorldStore: Send + Sync {
    /// Read the singleton config, if it has been created
    fn load_config(&self) -> StoreResult<Option<WorldConfig>>;

    /// Read the singleton config, inserting `init` when absent
    fn load_or_init_config(&self, init: WorldConfig) -> StoreResult<WorldConfig>;

    /// Atomic read-modify-write of the config. `None` when it does not exist.
    fn update_config(
        &self,
        patch: &mut dyn FnMut(&mut WorldConfig),
    ) -> StoreResult<Option<WorldConfig>>;

    /// Claim the next tick if it is due.
    ///
    /// Atomically checks `now - last_tick_at >= tick_ms - slack_ms` and, when
    /// it holds, stores `last_tick_at = now` and returns the claimed config.
    /// Returns `None` when the tick is not due or no config exists.
    fn claim_tick(&self, now: Millis, slack_ms: Millis) -> StoreResult<Option<WorldConfig>>;

    /// All players in insertion order
    fn players(&self) -> StoreResult<Vec<Player>>;

    fn player(&self, session: &SessionId) -> StoreResult<Option<Player>>;

    /// Insert, or replace the record with the same session id
    fn insert_player(&self, player: &Player) -> StoreResult<()>;

    /// Atomic read-modify-write of one player. `None` when absent.
    fn update_player(
        &self,
        session: &SessionId,
        patch: &mut dyn FnMut(&mut Player),
    ) -> StoreResult<Option<Player>>;

    /// Returns whether a record was deleted
    fn delete_player(&self, session: &SessionId) -> StoreResult<bool>;

    /// All fruits in insertion order
    fn fruits(&self) -> StoreResult<Vec<Fruit>>;

    fn insert_fruit(&self, fruit: NewFruit) -> StoreResult<FruitId>;

    /// Returns whether a record was deleted
    fn delete_fruit(&self, id: FruitId) -> StoreResult<bool>;

    fn clear_players(&self) -> StoreResult<usize>;

    fn clear_fruits(&self) -> StoreResult<usize>;
}

/// Shared conformance checks run against every backend
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::config::WorldDefaults;
    use crate::util::grid::{Cell, Direction};

    fn player(id: &str) -> Player {
        Player::spawn(
            SessionId::new(id),
            id.to_uppercase(),
            "#fff".into(),
            Cell::new(1, 1),
            Direction::Right,
            false,
            0,
        )
    }

    pub fn config_lifecycle(store: &dyn WorldStore) {
        assert!(store.load_config().unwrap().is_none());
        assert!(store.claim_tick(1_000, 5).unwrap().is_none());
        assert!(store.update_config(&mut |c| c.tick_ms = 99).unwrap().is_none());

        let init = WorldConfig::from_defaults(&WorldDefaults::default(), 1_000);
        let created = store.load_or_init_config(init.clone()).unwrap();
        assert_eq!(created, init);

        let mut other = init.clone();
        other.grid_width = 99;
        let existing = store.load_or_init_config(other).unwrap();
        assert_eq!(existing.grid_width, init.grid_width);

        let updated = store
            .update_config(&mut |c| c.target_bots = 9)
            .unwrap()
            .unwrap();
        assert_eq!(updated.target_bots, 9);
        assert_eq!(store.load_config().unwrap().unwrap().target_bots, 9);
    }

    pub fn claim_tick(store: &dyn WorldStore) {
        let init = WorldConfig::from_defaults(&WorldDefaults::default(), 1_000);
        store.load_or_init_config(init).unwrap();

        // 120ms tick, 5ms slack: due from 1115
        assert!(store.claim_tick(1_100, 5).unwrap().is_none());
        let claimed = store.claim_tick(1_115, 5).unwrap().unwrap();
        assert_eq!(claimed.last_tick_at, 1_115);
        assert!(store.claim_tick(1_115, 5).unwrap().is_none());
        assert!(store.claim_tick(1_200, 5).unwrap().is_none());
        assert!(store.claim_tick(1_230, 5).unwrap().is_some());
        assert_eq!(store.load_config().unwrap().unwrap().last_tick_at, 1_230);
    }

    pub fn player_records(store: &dyn WorldStore) {
        store.insert_player(&player("a")).unwrap();
        store.insert_player(&player("b")).unwrap();
        store.insert_player(&player("c")).unwrap();

        let ids: Vec<String> = store
            .players()
            .unwrap()
            .into_iter()
            .map(|p| p.session_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // replace keeps a single record per session
        let mut a = player("a");
        a.score = 7;
        store.insert_player(&a).unwrap();
        assert_eq!(store.players().unwrap().len(), 3);
        assert_eq!(store.player(&SessionId::new("a")).unwrap().unwrap().score, 7);

        let patched = store
            .update_player(&SessionId::new("b"), &mut |p| {
                p.alive = false;
                p.body.push(Cell::new(0, 1));
            })
            .unwrap()
            .unwrap();
        assert!(!patched.alive);
        assert_eq!(patched.body.len(), 2);
        assert_eq!(store.player(&SessionId::new("b")).unwrap().unwrap(), patched);

        assert!(store
            .update_player(&SessionId::new("zz"), &mut |p| p.score = 1)
            .unwrap()
            .is_none());

        assert!(store.delete_player(&SessionId::new("a")).unwrap());
        assert!(!store.delete_player(&SessionId::new("a")).unwrap());
        assert!(store.player(&SessionId::new("a")).unwrap().is_none());

        assert_eq!(store.clear_players().unwrap(), 2);
        assert!(store.players().unwrap().is_empty());
    }

    pub fn fruit_records(store: &dyn WorldStore) {
        let first = store
            .insert_fruit(NewFruit {
                cell: Cell::new(2, 3),
                spawned_at: 10,
                is_super: false,
            })
            .unwrap();
        let second = store
            .insert_fruit(NewFruit {
                cell: Cell::new(4, 5),
                spawned_at: 11,
                is_super: true,
            })
            .unwrap();
        assert_ne!(first, second);

        let fruits = store.fruits().unwrap();
        assert_eq!(fruits.len(), 2);
        assert_eq!(fruits[0].id, first);
        assert_eq!(fruits[0].cell(), Cell::new(2, 3));
        assert!(fruits[1].is_super);

        assert!(store.delete_fruit(first).unwrap());
        assert!(!store.delete_fruit(first).unwrap());
        assert_eq!(store.fruits().unwrap().len(), 1);

        assert_eq!(store.clear_fruits().unwrap(), 1);
        assert!(store.fruits().unwrap().is_empty());
    }
}
