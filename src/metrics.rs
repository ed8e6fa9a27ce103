//! Prometheus-compatible metrics
//!
//! Served by the HTTP router on `/metrics` (text) and `/metrics/json`.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::game::state::{Fruit, Player};

/// Tick samples kept for percentile calculation
const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the arena server
#[derive(Debug)]
pub struct Metrics {
    // Player counts, refreshed after every advanced tick
    pub total_players: AtomicU64,
    pub human_players: AtomicU64,
    pub bot_players: AtomicU64,
    pub alive_players: AtomicU64,

    // Fruit counts
    pub fruit_count: AtomicU64,
    pub super_fruit_count: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Tick counters
    pub ticks_advanced: AtomicU64,
    pub ticks_debounced: AtomicU64,

    // Gameplay counters
    pub deaths: AtomicU64,
    pub fruits_eaten: AtomicU64,
    pub super_eliminations: AtomicU64,
    pub players_pruned: AtomicU64,
    pub bots_spawned: AtomicU64,

    start_time: Instant,

    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_players: AtomicU64::new(0),
            human_players: AtomicU64::new(0),
            bot_players: AtomicU64::new(0),
            alive_players: AtomicU64::new(0),
            fruit_count: AtomicU64::new(0),
            super_fruit_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            ticks_advanced: AtomicU64::new(0),
            ticks_debounced: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            fruits_eaten: AtomicU64::new(0),
            super_eliminations: AtomicU64::new(0),
            players_pruned: AtomicU64::new(0),
            bots_spawned: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record an advanced tick's duration and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.ticks_advanced.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn record_debounced(&self) {
        self.ticks_debounced.fetch_add(1, Ordering::Relaxed);
    }

    /// Refresh population gauges from a fresh read of the world
    pub fn observe_world(&self, players: &[Player], fruits: &[Fruit]) {
        let bots = players.iter().filter(|p| p.is_bot).count() as u64;
        let alive = players.iter().filter(|p| p.alive).count() as u64;
        let supers = fruits.iter().filter(|f| f.is_super).count() as u64;

        self.total_players
            .store(players.len() as u64, Ordering::Relaxed);
        self.human_players
            .store(players.len() as u64 - bots, Ordering::Relaxed);
        self.bot_players.store(bots, Ordering::Relaxed);
        self.alive_players.store(alive, Ordering::Relaxed);
        self.fruit_count.store(fruits.len() as u64, Ordering::Relaxed);
        self.super_fruit_count.store(supers, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("snake_arena_players_total", "Total number of players", "gauge",
            self.total_players.load(Ordering::Relaxed));
        metric!("snake_arena_players_human", "Number of human players", "gauge",
            self.human_players.load(Ordering::Relaxed));
        metric!("snake_arena_players_bot", "Number of bot players", "gauge",
            self.bot_players.load(Ordering::Relaxed));
        metric!("snake_arena_players_alive", "Number of alive players", "gauge",
            self.alive_players.load(Ordering::Relaxed));

        metric!("snake_arena_fruits", "Fruits on the grid", "gauge",
            self.fruit_count.load(Ordering::Relaxed));
        metric!("snake_arena_super_fruits", "Super-fruits on the grid", "gauge",
            self.super_fruit_count.load(Ordering::Relaxed));

        metric!("snake_arena_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("snake_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("snake_arena_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("snake_arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));

        metric!("snake_arena_ticks_advanced_total", "Ticks that advanced the world", "counter",
            self.ticks_advanced.load(Ordering::Relaxed));
        metric!("snake_arena_ticks_debounced_total", "Tick requests rejected by the debounce guard", "counter",
            self.ticks_debounced.load(Ordering::Relaxed));

        metric!("snake_arena_deaths_total", "Snakes killed by collisions", "counter",
            self.deaths.load(Ordering::Relaxed));
        metric!("snake_arena_fruits_eaten_total", "Fruits eaten", "counter",
            self.fruits_eaten.load(Ordering::Relaxed));
        metric!("snake_arena_super_eliminations_total", "Snakes eliminated by super powers", "counter",
            self.super_eliminations.load(Ordering::Relaxed));
        metric!("snake_arena_players_pruned_total", "Players removed for inactivity", "counter",
            self.players_pruned.load(Ordering::Relaxed));
        metric!("snake_arena_bots_spawned_total", "Bots spawned", "counter",
            self.bots_spawned.load(Ordering::Relaxed));

        metric!("snake_arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> serde_json::Value {
        let load = |v: &AtomicU64| v.load(Ordering::Relaxed);
        serde_json::json!({
            "players": {
                "total": load(&self.total_players),
                "human": load(&self.human_players),
                "bot": load(&self.bot_players),
                "alive": load(&self.alive_players),
            },
            "fruits": {
                "total": load(&self.fruit_count),
                "super": load(&self.super_fruit_count),
            },
            "performance": {
                "tick_time_us": load(&self.tick_time_us),
                "tick_time_p95_us": load(&self.tick_time_p95_us),
                "tick_time_p99_us": load(&self.tick_time_p99_us),
                "tick_time_max_us": load(&self.tick_time_max_us),
                "ticks_advanced": load(&self.ticks_advanced),
                "ticks_debounced": load(&self.ticks_debounced),
            },
            "game": {
                "deaths": load(&self.deaths),
                "fruits_eaten": load(&self.fruits_eaten),
                "super_eliminations": load(&self.super_eliminations),
                "players_pruned": load(&self.players_pruned),
                "bots_spawned": load(&self.bots_spawned),
                "uptime_seconds": self.uptime_seconds(),
            },
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
