//! In-process world store
//!
//! Records live behind one `RwLock`, so each call is atomic on its own.
//! Calls are not grouped into transactions: a tick is a sequence of calls
//! and other callers may interleave between them.

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{StoreResult, WorldStore};
use crate::game::clock::Millis;
use crate::game::state::{Fruit, FruitId, NewFruit, Player, WorldConfig};
use crate::net::session::SessionId;

#[derive(Debug, Default)]
struct Tables {
    config: Option<WorldConfig>,
    /// Session -> (insertion sequence, record)
    players: HashMap<SessionId, (u64, Player)>,
    fruits: HashMap<FruitId, Fruit>,
    next_player_seq: u64,
    next_fruit_id: FruitId,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorldStore for MemoryStore {
    fn load_config(&self) -> StoreResult<Option<WorldConfig>> {
        Ok(self.tables.read().config.clone())
    }

    fn load_or_init_config(&self, init: WorldConfig) -> StoreResult<WorldConfig> {
        if let Some(config) = self.tables.read().config.clone() {
            return Ok(config);
        }
        let mut tables = self.tables.write();
        Ok(tables.config.get_or_insert(init).clone())
    }

    fn update_config(
        &self,
        patch: &mut dyn FnMut(&mut WorldConfig),
    ) -> StoreResult<Option<WorldConfig>> {
        let mut tables = self.tables.write();
        Ok(tables.config.as_mut().map(|config| {
            patch(config);
            config.clone()
        }))
    }

    fn claim_tick(&self, now: Millis, slack_ms: Millis) -> StoreResult<Option<WorldConfig>> {
        let mut tables = self.tables.write();
        let Some(config) = tables.config.as_mut() else {
            return Ok(None);
        };
        if !config.is_tick_due(now, slack_ms) {
            return Ok(None);
        }
        config.last_tick_at = now;
        Ok(Some(config.clone()))
    }

    fn players(&self) -> StoreResult<Vec<Player>> {
        let tables = self.tables.read();
        let mut rows: Vec<&(u64, Player)> = tables.players.values().collect();
        rows.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, p)| p.clone()).collect())
    }

    fn player(&self, session: &SessionId) -> StoreResult<Option<Player>> {
        Ok(self.tables.read().players.get(session).map(|(_, p)| p.clone()))
    }

    fn insert_player(&self, player: &Player) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let tables = &mut *tables;
        match tables.players.get_mut(&player.session_id) {
            Some((_, existing)) => *existing = player.clone(),
            None => {
                let seq = tables.next_player_seq;
                tables.next_player_seq += 1;
                tables
                    .players
                    .insert(player.session_id.clone(), (seq, player.clone()));
            }
        }
        Ok(())
    }

    fn update_player(
        &self,
        session: &SessionId,
        patch: &mut dyn FnMut(&mut Player),
    ) -> StoreResult<Option<Player>> {
        let mut tables = self.tables.write();
        Ok(tables.players.get_mut(session).map(|(_, player)| {
            patch(player);
            player.clone()
        }))
    }

    fn delete_player(&self, session: &SessionId) -> StoreResult<bool> {
        Ok(self.tables.write().players.remove(session).is_some())
    }

    fn fruits(&self) -> StoreResult<Vec<Fruit>> {
        let tables = self.tables.read();
        let mut fruits: Vec<Fruit> = tables.fruits.values().copied().collect();
        fruits.sort_unstable_by_key(|f| f.id);
        Ok(fruits)
    }

    fn insert_fruit(&self, fruit: NewFruit) -> StoreResult<FruitId> {
        let mut tables = self.tables.write();
        tables.next_fruit_id += 1;
        let id = tables.next_fruit_id;
        tables.fruits.insert(id, fruit.with_id(id));
        Ok(id)
    }

    fn delete_fruit(&self, id: FruitId) -> StoreResult<bool> {
        Ok(self.tables.write().fruits.remove(&id).is_some())
    }

    fn clear_players(&self) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let count = tables.players.len();
        tables.players.clear();
        Ok(count)
    }

    fn clear_fruits(&self) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let count = tables.fruits.len();
        tables.fruits.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn test_config_lifecycle() {
        conformance::config_lifecycle(&MemoryStore::new());
    }

    #[test]
    fn test_claim_tick() {
        conformance::claim_tick(&MemoryStore::new());
    }

    #[test]
    fn test_player_records() {
        conformance::player_records(&MemoryStore::new());
    }

    #[test]
    fn test_fruit_records() {
        conformance::fruit_records(&MemoryStore::new());
    }

    #[test]
    fn test_concurrent_claims_accept_one() {
        use crate::config::WorldDefaults;
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        store
            .load_or_init_config(WorldConfig::from_defaults(&WorldDefaults::default(), 0))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.claim_tick(500, 5).unwrap().is_some())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|claimed| *claimed)
            .count();
        assert_eq!(accepted, 1);
    }
}
