//! World records and read-only views
//!
//! Contains the singleton world config, players, fruits, and the snapshot
//! served to display collaborators.

use serde::{Deserialize, Serialize};

use crate::config::WorldDefaults;
use crate::game::clock::Millis;
use crate::game::constants::{population, tick, world};
use crate::net::session::SessionId;
use crate::util::grid::{Cell, Direction};

/// Fruit record identifier (assigned by the store)
pub type FruitId = u64;

/// Singleton world configuration (key `"global"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    pub tick_ms: u32,
    /// Timestamp of the last accepted advance. Doubles as the debounce token.
    pub last_tick_at: Millis,
    /// Stored and editable, not consulted by the fruit policy
    pub max_fruits: u32,
    pub target_bots: u32,
}

impl WorldConfig {
    pub fn from_defaults(defaults: &WorldDefaults, now: Millis) -> Self {
        Self {
            grid_width: defaults.grid_width,
            grid_height: defaults.grid_height,
            tick_ms: defaults.tick_ms,
            last_tick_at: now,
            max_fruits: defaults.max_fruits,
            target_bots: defaults.target_bots,
        }
    }

    /// Number of cells on the playfield
    pub fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// Whether an advance at `now` would pass the debounce guard
    pub fn is_tick_due(&self, now: Millis, slack_ms: Millis) -> bool {
        now - self.last_tick_at >= self.tick_ms as Millis - slack_ms
    }
}

/// Partial config change. Values below their minimum are clamped, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default)]
    pub tick_ms: Option<f64>,
    #[serde(default)]
    pub grid_width: Option<f64>,
    #[serde(default)]
    pub grid_height: Option<f64>,
    #[serde(default)]
    pub max_fruits: Option<f64>,
    #[serde(default)]
    pub target_bots: Option<f64>,
}

impl ConfigUpdate {
    pub fn apply(&self, config: &mut WorldConfig) {
        if let Some(v) = self.tick_ms {
            config.tick_ms = clamp_tick_ms(v);
        }
        if let Some(v) = self.grid_width {
            config.grid_width = clamp_grid_dimension(v);
        }
        if let Some(v) = self.grid_height {
            config.grid_height = clamp_grid_dimension(v);
        }
        if let Some(v) = self.max_fruits {
            config.max_fruits = clamp_count(v);
        }
        if let Some(v) = self.target_bots {
            config.target_bots = clamp_count(v);
        }
    }
}

pub fn clamp_tick_ms(v: f64) -> u32 {
    clamp_floor(v, tick::MIN_TICK_MS, u32::MAX)
}

pub fn clamp_grid_dimension(v: f64) -> u32 {
    // cells are i32 on the wire
    clamp_floor(v, world::MIN_GRID_DIMENSION, i32::MAX as u32)
}

/// Non-negative whole count, used for fruit and bot limits
pub fn clamp_count(v: f64) -> u32 {
    clamp_floor(v, 0, u32::MAX)
}

fn clamp_floor(v: f64, min: u32, max: u32) -> u32 {
    if v.is_nan() {
        return min;
    }
    v.floor().clamp(min as f64, max as f64) as u32
}

/// A snake, human or bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub session_id: SessionId,
    pub name: String,
    pub color: String,
    /// Head first, tail last. Never empty while the record exists.
    pub body: Vec<Cell>,
    pub direction: Direction,
    pub alive: bool,
    pub is_bot: bool,
    pub score: u32,
    pub last_seen: Millis,
    /// Holds an unspent super-fruit power
    #[serde(default)]
    pub has_super: bool,
}

impl Player {
    /// A fresh one-cell snake
    pub fn spawn(
        session_id: SessionId,
        name: String,
        color: String,
        head: Cell,
        direction: Direction,
        is_bot: bool,
        now: Millis,
    ) -> Self {
        Self {
            session_id,
            name,
            color,
            body: vec![head],
            direction,
            alive: true,
            is_bot,
            score: 0,
            last_seen: now,
            has_super: false,
        }
    }

    pub fn head(&self) -> Option<Cell> {
        self.body.first().copied()
    }

    pub fn tail(&self) -> Option<Cell> {
        self.body.last().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// No heartbeat within the inactivity window
    pub fn is_inactive(&self, now: Millis) -> bool {
        now - self.last_seen > population::INACTIVITY_TIMEOUT_MS
    }

    /// Score after a collision penalty
    pub fn penalized_score(&self) -> u32 {
        self.score.saturating_sub(1)
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            session_id: self.session_id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            body: self.body.clone(),
            alive: self.alive,
            is_bot: self.is_bot,
            score: self.score,
            has_super: self.has_super,
        }
    }
}

/// A fruit on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fruit {
    pub id: FruitId,
    pub x: i32,
    pub y: i32,
    pub spawned_at: Millis,
    pub is_super: bool,
}

impl Fruit {
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    pub fn view(&self) -> FruitView {
        FruitView {
            x: self.x,
            y: self.y,
            is_super: self.is_super,
        }
    }
}

/// A fruit that has not been given an id yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewFruit {
    pub cell: Cell,
    pub spawned_at: Millis,
    pub is_super: bool,
}

impl NewFruit {
    pub fn with_id(self, id: FruitId) -> Fruit {
        Fruit {
            id,
            x: self.cell.x,
            y: self.cell.y,
            spawned_at: self.spawned_at,
            is_super: self.is_super,
        }
    }
}

/// One consistent read of every record, taken at the start of a tick phase
#[derive(Debug, Clone)]
pub struct WorldState {
    pub config: WorldConfig,
    pub players: Vec<Player>,
    pub fruits: Vec<Fruit>,
}

impl WorldState {
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            grid_width: self.config.grid_width,
            grid_height: self.config.grid_height,
            tick_ms: self.config.tick_ms,
            players: self.players.iter().map(Player::view).collect(),
            fruits: self.fruits.iter().map(Fruit::view).collect(),
        }
    }
}

/// Read surface served to display collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub grid_width: u32,
    pub grid_height: u32,
    pub tick_ms: u32,
    pub players: Vec<PlayerView>,
    pub fruits: Vec<FruitView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub session_id: SessionId,
    pub name: String,
    pub color: String,
    pub body: Vec<Cell>,
    pub alive: bool,
    pub is_bot: bool,
    pub score: u32,
    pub has_super: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FruitView {
    pub x: i32,
    pub y: i32,
    pub is_super: bool,
}
