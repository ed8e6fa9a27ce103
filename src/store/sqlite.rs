//! SQLite-backed world store
//!
//! Player bodies are stored as JSON next to the indexed session id. Each
//! trait call runs under the connection lock, and read-modify-write calls
//! run inside a transaction, so every call is atomic for its record.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::{StoreError, StoreResult, WorldStore};
use crate::game::clock::Millis;
use crate::game::constants::world::GLOBAL_KEY;
use crate::game::state::{Fruit, FruitId, NewFruit, Player, WorldConfig};
use crate::net::session::SessionId;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS world (
        key          TEXT    PRIMARY KEY,
        grid_width   INTEGER NOT NULL,
        grid_height  INTEGER NOT NULL,
        tick_ms      INTEGER NOT NULL,
        last_tick_at INTEGER NOT NULL,
        max_fruits   INTEGER NOT NULL,
        target_bots  INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS players (
        seq        INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT    NOT NULL UNIQUE,
        data       TEXT    NOT NULL
    );

    CREATE TABLE IF NOT EXISTS fruits (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        x          INTEGER NOT NULL,
        y          INTEGER NOT NULL,
        spawned_at INTEGER NOT NULL,
        is_super   INTEGER NOT NULL
    );
";

const CONFIG_COLUMNS: &str =
    "grid_width, grid_height, tick_ms, last_tick_at, max_fruits, target_bots";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::initialize(Connection::open(path)?)
    }

    /// Private database that disappears with the store
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<WorldConfig> {
    Ok(WorldConfig {
        grid_width: row.get(0)?,
        grid_height: row.get(1)?,
        tick_ms: row.get(2)?,
        last_tick_at: row.get(3)?,
        max_fruits: row.get(4)?,
        target_bots: row.get(5)?,
    })
}

fn fruit_from_row(row: &Row<'_>) -> rusqlite::Result<Fruit> {
    Ok(Fruit {
        id: row.get::<_, i64>(0)? as FruitId,
        x: row.get(1)?,
        y: row.get(2)?,
        spawned_at: row.get(3)?,
        is_super: row.get(4)?,
    })
}

fn select_config(conn: &Connection) -> StoreResult<Option<WorldConfig>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM world WHERE key = ?1", CONFIG_COLUMNS),
            params![GLOBAL_KEY],
            config_from_row,
        )
        .optional()?)
}

fn write_config(conn: &Connection, config: &WorldConfig) -> StoreResult<()> {
    conn.execute(
        "UPDATE world SET grid_width = ?2, grid_height = ?3, tick_ms = ?4,
                last_tick_at = ?5, max_fruits = ?6, target_bots = ?7
         WHERE key = ?1",
        params![
            GLOBAL_KEY,
            config.grid_width,
            config.grid_height,
            config.tick_ms,
            config.last_tick_at,
            config.max_fruits,
            config.target_bots
        ],
    )?;
    Ok(())
}

fn decode_player(session: &str, data: &str) -> StoreResult<Player> {
    let player: Player = serde_json::from_str(data)?;
    if player.session_id.as_str() != session || player.body.is_empty() {
        return Err(StoreError::Corrupt(format!("player row '{}'", session)));
    }
    Ok(player)
}

impl WorldStore for SqliteStore {
    fn load_config(&self) -> StoreResult<Option<WorldConfig>> {
        select_config(&self.conn.lock())
    }

    fn load_or_init_config(&self, init: WorldConfig) -> StoreResult<WorldConfig> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO world (key, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                CONFIG_COLUMNS
            ),
            params![
                GLOBAL_KEY,
                init.grid_width,
                init.grid_height,
                init.tick_ms,
                init.last_tick_at,
                init.max_fruits,
                init.target_bots
            ],
        )?;
        select_config(&conn)?.ok_or_else(|| StoreError::Corrupt("world row missing".into()))
    }

    fn update_config(
        &self,
        patch: &mut dyn FnMut(&mut WorldConfig),
    ) -> StoreResult<Option<WorldConfig>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let Some(mut config) = select_config(&tx)? else {
            return Ok(None);
        };
        patch(&mut config);
        write_config(&tx, &config)?;
        tx.commit()?;
        Ok(Some(config))
    }

    fn claim_tick(&self, now: Millis, slack_ms: Millis) -> StoreResult<Option<WorldConfig>> {
        let conn = self.conn.lock();
        let claimed = conn.execute(
            "UPDATE world SET last_tick_at = ?2
             WHERE key = ?1 AND ?2 - last_tick_at >= tick_ms - ?3",
            params![GLOBAL_KEY, now, slack_ms],
        )?;
        if claimed == 0 {
            return Ok(None);
        }
        select_config(&conn)
    }

    fn players(&self) -> StoreResult<Vec<Player>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT session_id, data FROM players ORDER BY seq")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut players = Vec::new();
        for row in rows {
            let (session, data) = row?;
            players.push(decode_player(&session, &data)?);
        }
        Ok(players)
    }

    fn player(&self, session: &SessionId) -> StoreResult<Option<Player>> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM players WHERE session_id = ?1",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| decode_player(session.as_str(), &d)).transpose()
    }

    fn insert_player(&self, player: &Player) -> StoreResult<()> {
        let data = serde_json::to_string(player)?;
        self.conn.lock().execute(
            "INSERT INTO players (session_id, data) VALUES (?1, ?2)
             ON CONFLICT(session_id) DO UPDATE SET data = excluded.data",
            params![player.session_id.as_str(), data],
        )?;
        Ok(())
    }

    fn update_player(
        &self,
        session: &SessionId,
        patch: &mut dyn FnMut(&mut Player),
    ) -> StoreResult<Option<Player>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let data: Option<String> = tx
            .query_row(
                "SELECT data FROM players WHERE session_id = ?1",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(data) = data else {
            return Ok(None);
        };
        let mut player = decode_player(session.as_str(), &data)?;
        patch(&mut player);
        tx.execute(
            "UPDATE players SET data = ?2 WHERE session_id = ?1",
            params![session.as_str(), serde_json::to_string(&player)?],
        )?;
        tx.commit()?;
        Ok(Some(player))
    }

    fn delete_player(&self, session: &SessionId) -> StoreResult<bool> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM players WHERE session_id = ?1",
            params![session.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn fruits(&self) -> StoreResult<Vec<Fruit>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, x, y, spawned_at, is_super FROM fruits ORDER BY id")?;
        let fruits = stmt
            .query_map([], fruit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(fruits)
    }

    fn insert_fruit(&self, fruit: NewFruit) -> StoreResult<FruitId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO fruits (x, y, spawned_at, is_super) VALUES (?1, ?2, ?3, ?4)",
            params![fruit.cell.x, fruit.cell.y, fruit.spawned_at, fruit.is_super],
        )?;
        Ok(conn.last_insert_rowid() as FruitId)
    }

    fn delete_fruit(&self, id: FruitId) -> StoreResult<bool> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM fruits WHERE id = ?1", params![id as i64])?;
        Ok(deleted > 0)
    }

    fn clear_players(&self) -> StoreResult<usize> {
        Ok(self.conn.lock().execute("DELETE FROM players", [])?)
    }

    fn clear_fruits(&self) -> StoreResult<usize> {
        Ok(self.conn.lock().execute("DELETE FROM fruits", [])?)
    }
}
