//! Arena engine
//!
//! Stateless between calls: every operation reads what it needs from the
//! [`WorldStore`], decides, and writes back record by record. Many callers may
//! drive the same world at once; the store's per-record atomicity and the
//! tick claim are the only coordination.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::WorldDefaults;
use crate::game::clock::{Clock, Millis};
use crate::game::constants::tick::{DEBOUNCE_SLACK_MS, DEFAULT_TICK_MS};
use crate::game::state::{
    clamp_tick_ms, ConfigUpdate, Player, WorldConfig, WorldSnapshot, WorldState,
};
use crate::game::systems::{ai, movement, population, super_fruit};
use crate::metrics::Metrics;
use crate::net::session::SessionId;
use crate::store::{StoreError, WorldStore};
use crate::util::grid::{Cell, Direction};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("World config missing")]
    ConfigMissing,
}

/// What a call to [`Engine::advance`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick was not due yet, or another caller claimed it
    Debounced,
    Advanced(TickReport),
}

impl TickOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, TickOutcome::Advanced(_))
    }
}

/// Per-phase counts of an advanced tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub pruned: usize,
    pub fruits_spawned: usize,
    pub bots_spawned: usize,
    pub moved: usize,
    pub ate: usize,
    pub died: usize,
    pub powers_gained: usize,
}

pub struct Engine {
    store: Arc<dyn WorldStore>,
    clock: Arc<dyn Clock>,
    defaults: WorldDefaults,
    rng: Mutex<StdRng>,
    metrics: Arc<Metrics>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn WorldStore>,
        clock: Arc<dyn Clock>,
        defaults: WorldDefaults,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::with_rng(store, clock, defaults, metrics, StdRng::from_entropy())
    }

    /// Deterministic randomness for tests and benches
    pub fn with_seed(
        store: Arc<dyn WorldStore>,
        clock: Arc<dyn Clock>,
        defaults: WorldDefaults,
        metrics: Arc<Metrics>,
        seed: u64,
    ) -> Self {
        Self::with_rng(store, clock, defaults, metrics, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        store: Arc<dyn WorldStore>,
        clock: Arc<dyn Clock>,
        defaults: WorldDefaults,
        metrics: Arc<Metrics>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            clock,
            defaults,
            rng: Mutex::new(rng),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current world for display. Never writes, not even the lazy config.
    pub fn snapshot(&self) -> EngineResult<WorldSnapshot> {
        let config = match self.store.load_config()? {
            Some(config) => config,
            None => WorldConfig::from_defaults(&self.defaults, self.now()),
        };
        Ok(self.read_world(config)?.snapshot())
    }

    /// The world config, created with defaults on first access
    pub fn config(&self) -> EngineResult<WorldConfig> {
        let init = WorldConfig::from_defaults(&self.defaults, self.now());
        Ok(self.store.load_or_init_config(init)?)
    }

    fn read_world(&self, config: WorldConfig) -> EngineResult<WorldState> {
        Ok(WorldState {
            config,
            players: self.store.players()?,
            fruits: self.store.fruits()?,
        })
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    /// Create the player, or refresh and revive it when the session already has one
    pub fn join(&self, session: &SessionId, name: &str, color: Option<&str>) -> EngineResult<()> {
        if !session.is_valid() {
            return Ok(());
        }
        let config = self.config()?;
        let now = self.now();
        let name = population::sanitize_name(name);
        let color = color.map(str::trim).filter(|c| !c.is_empty());

        let existing = self.store.update_player(session, &mut |p| {
            p.name.clone_from(&name);
            if let Some(color) = color {
                p.color = color.to_string();
            }
            p.last_seen = now;
            p.alive = true;
        })?;
        if existing.is_some() {
            debug!("Player {} rejoined", session);
            return Ok(());
        }

        let (head, direction, color) = {
            let mut rng = self.rng.lock();
            let head = population::random_cell(&mut *rng, &config);
            let direction = population::random_direction(&mut *rng);
            let color = match color {
                Some(c) => c.to_string(),
                None => population::random_color(&mut *rng),
            };
            (head, direction, color)
        };
        let player = Player::spawn(session.clone(), name, color, head, direction, false, now);
        self.store.insert_player(&player)?;
        debug!("Player {} joined at ({}, {})", session, head.x, head.y);
        Ok(())
    }

    /// Delete the player. Returns whether a record existed.
    pub fn leave(&self, session: &SessionId) -> EngineResult<bool> {
        if !session.is_valid() {
            return Ok(false);
        }
        let removed = self.store.delete_player(session)?;
        if removed {
            debug!("Player {} left", session);
        }
        Ok(removed)
    }

    pub fn heartbeat(&self, session: &SessionId) -> EngineResult<()> {
        if !session.is_valid() {
            return Ok(());
        }
        let now = self.now();
        self.store.update_player(session, &mut |p| p.last_seen = now)?;
        Ok(())
    }

    /// Steer a living snake. Returns whether the heading changed.
    ///
    /// A heading that reverses the current direction, or that would put the
    /// head back onto its neck, is ignored.
    pub fn set_direction(&self, session: &SessionId, dir: Direction) -> EngineResult<bool> {
        if !session.is_valid() {
            return Ok(false);
        }
        let config = self.config()?;
        let mut applied = false;
        self.store.update_player(session, &mut |p| {
            if p.alive
                && !dir.is_reverse_of(p.direction)
                && !turns_onto_neck(p, dir, &config)
            {
                p.direction = dir;
                applied = true;
            }
        })?;
        Ok(applied)
    }

    /// Spend a held super power on the nearest living rival.
    ///
    /// Returns the eliminated session, or `None` when the invoker is absent,
    /// dead, powerless, or alone. Without a rival the power is kept.
    pub fn consume_super_power(&self, session: &SessionId) -> EngineResult<Option<SessionId>> {
        if !session.is_valid() {
            return Ok(None);
        }
        let Some(invoker) = self.store.player(session)? else {
            return Ok(None);
        };
        if !invoker.alive || !invoker.has_super {
            return Ok(None);
        }

        let config = self.config()?;
        let players = self.store.players()?;
        let Some(target) =
            super_fruit::nearest_rival(&invoker, &players, config.grid_width, config.grid_height)
                .map(|p| p.session_id.clone())
        else {
            return Ok(None);
        };

        // Spend first so two concurrent calls cannot both fire
        let mut spent = false;
        self.store.update_player(session, &mut |p| {
            if p.alive && p.has_super {
                p.has_super = false;
                spent = true;
            }
        })?;
        if !spent {
            return Ok(None);
        }

        self.store.update_player(&target, &mut |p| p.alive = false)?;
        self.metrics
            .super_eliminations
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        info!("Player {} used a super power on {}", session, target);
        Ok(Some(target))
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the world one tick if it is due.
    ///
    /// Phases run in order: prune inactive players, top up fruit, top up bots,
    /// then move every living snake against one pre-move snapshot.
    pub fn advance(&self) -> EngineResult<TickOutcome> {
        self.config()?;
        let now = self.now();
        let Some(config) = self.store.claim_tick(now, DEBOUNCE_SLACK_MS)? else {
            self.metrics.record_debounced();
            return Ok(TickOutcome::Debounced);
        };

        let started = Instant::now();
        let mut report = TickReport::default();

        self.prune_inactive(now, &mut report)?;
        self.replenish(&config, now, &mut report)?;
        self.move_snakes(&config, now, &mut report)?;

        let world = self.read_world(config)?;
        self.metrics.observe_world(&world.players, &world.fruits);
        self.metrics.record_tick_time(started.elapsed());
        self.record_report(&report);

        debug!(
            "Tick at {}: pruned={} fruits+={} bots+={} moved={} ate={} died={} powers={}",
            now,
            report.pruned,
            report.fruits_spawned,
            report.bots_spawned,
            report.moved,
            report.ate,
            report.died,
            report.powers_gained
        );
        Ok(TickOutcome::Advanced(report))
    }

    fn prune_inactive(&self, now: Millis, report: &mut TickReport) -> EngineResult<()> {
        let players = self.store.players()?;
        for player in population::inactive(&players, now) {
            if self.store.delete_player(&player.session_id)? {
                debug!("Pruned inactive player {}", player.session_id);
                report.pruned += 1;
            }
        }
        Ok(())
    }

    fn replenish(
        &self,
        config: &WorldConfig,
        now: Millis,
        report: &mut TickReport,
    ) -> EngineResult<()> {
        let players = self.store.players()?;
        let fruits = self.store.fruits()?;

        let fruit_deficit =
            population::fruit_deficit(players.len(), fruits.len(), config.cell_count());
        for _ in 0..fruit_deficit {
            let fruit = population::random_fruit(&mut *self.rng.lock(), config, now);
            self.store.insert_fruit(fruit)?;
            report.fruits_spawned += 1;
        }

        let bots = players.iter().filter(|p| p.is_bot).count();
        for _ in 0..population::bot_deficit(config.target_bots, bots) {
            self.insert_bot(config, now)?;
            report.bots_spawned += 1;
        }
        Ok(())
    }

    fn move_snakes(
        &self,
        config: &WorldConfig,
        now: Millis,
        report: &mut TickReport,
    ) -> EngineResult<()> {
        let world = self.read_world(config.clone())?;
        let plans = movement::plan_moves(&world.players, config.grid_width, config.grid_height);
        let mut fruits = world.fruits;

        for plan in plans {
            let player = &world.players[plan.index];
            match plan.verdict {
                movement::MoveVerdict::Clear { head } => {
                    // A fruit another caller already deleted is not eaten
                    let eaten = match movement::take_fruit_at(&mut fruits, head) {
                        Some(fruit) => self.store.delete_fruit(fruit.id)?.then_some(fruit),
                        None => None,
                    };
                    let grow = eaten.is_some_and(|f| !f.is_super);
                    let power = eaten.is_some_and(|f| f.is_super);
                    let body = movement::advance_body(&player.body, head, grow);
                    let turn = if player.is_bot {
                        ai::decide_turn(&mut *self.rng.lock(), player.direction)
                    } else {
                        None
                    };

                    let mut committed = false;
                    self.store.update_player(&player.session_id, &mut |p| {
                        if !p.alive {
                            return;
                        }
                        p.body.clone_from(&body);
                        if grow {
                            p.score = p.score.saturating_add(1);
                        }
                        if power {
                            p.has_super = true;
                        }
                        if let Some(dir) = turn {
                            p.direction = dir;
                        }
                        if p.is_bot {
                            p.last_seen = now;
                        }
                        committed = true;
                    })?;

                    if committed {
                        report.moved += 1;
                        report.ate += usize::from(grow);
                        report.powers_gained += usize::from(power);
                    }
                }
                verdict => {
                    let mut killed = false;
                    self.store.update_player(&player.session_id, &mut |p| {
                        if p.alive {
                            p.alive = false;
                            p.score = p.penalized_score();
                            killed = true;
                        }
                    })?;
                    if killed {
                        debug!("{} crashed at {:?}", player.session_id, verdict);
                        report.died += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn record_report(&self, report: &TickReport) {
        use std::sync::atomic::Ordering::Relaxed;
        self.metrics.deaths.fetch_add(report.died as u64, Relaxed);
        self.metrics
            .fruits_eaten
            .fetch_add((report.ate + report.powers_gained) as u64, Relaxed);
        self.metrics
            .players_pruned
            .fetch_add(report.pruned as u64, Relaxed);
        self.metrics
            .bots_spawned
            .fetch_add(report.bots_spawned as u64, Relaxed);
    }

    // ========================================================================
    // Bots
    // ========================================================================

    /// Add one bot at a random cell
    pub fn spawn_bot(&self) -> EngineResult<SessionId> {
        let config = self.config()?;
        self.insert_bot(&config, self.now())
    }

    fn insert_bot(&self, config: &WorldConfig, now: Millis) -> EngineResult<SessionId> {
        let (session, head, direction, color) = {
            let mut rng = self.rng.lock();
            (
                SessionId::generate_bot(&mut *rng),
                population::random_cell(&mut *rng, config),
                population::random_direction(&mut *rng),
                population::random_color(&mut *rng),
            )
        };
        let name = session.bot_display_name();
        let bot = Player::spawn(session.clone(), name, color, head, direction, true, now);
        self.store.insert_player(&bot)?;
        debug!("Spawned bot {} at ({}, {})", session, head.x, head.y);
        Ok(session)
    }

    // ========================================================================
    // Admin
    // ========================================================================

    /// Patch config values, clamping each to its minimum
    pub fn admin_set_config(&self, update: ConfigUpdate) -> EngineResult<WorldConfig> {
        self.config()?;
        let config = self
            .store
            .update_config(&mut |c| update.apply(c))?
            .ok_or(EngineError::ConfigMissing)?;
        info!(
            "Config updated: {}x{} grid, tick {}ms, max fruits {}, target bots {}",
            config.grid_width,
            config.grid_height,
            config.tick_ms,
            config.max_fruits,
            config.target_bots
        );
        Ok(config)
    }

    /// Clear fruit and respawn every player as a fresh snake, keeping the roster
    pub fn admin_restart(&self, tick_ms: Option<f64>) -> EngineResult<()> {
        let config = self.config()?;
        let now = self.now();
        self.store.clear_fruits()?;

        let players = self.store.players()?;
        for player in &players {
            let (head, direction): (Cell, Direction) = {
                let mut rng = self.rng.lock();
                (
                    population::random_cell(&mut *rng, &config),
                    population::random_direction(&mut *rng),
                )
            };
            self.store.update_player(&player.session_id, &mut |p| {
                p.body = vec![head];
                p.direction = direction;
                p.alive = true;
                p.score = 0;
                p.has_super = false;
                p.last_seen = now;
            })?;
        }

        self.reset_tick_clock(now, tick_ms)?;
        info!("World restarted with {} players", players.len());
        Ok(())
    }

    /// Delete every player and fruit, keeping the config
    pub fn admin_wipe(&self, tick_ms: Option<f64>) -> EngineResult<()> {
        self.config()?;
        let now = self.now();
        let players = self.store.clear_players()?;
        let fruits = self.store.clear_fruits()?;
        self.reset_tick_clock(now, tick_ms)?;
        info!("World wiped ({} players, {} fruits removed)", players, fruits);
        Ok(())
    }

    fn reset_tick_clock(&self, now: Millis, tick_ms: Option<f64>) -> EngineResult<()> {
        self.store
            .update_config(&mut |c| {
                c.last_tick_at = now;
                if let Some(t) = tick_ms {
                    c.tick_ms = clamp_tick_ms(t);
                }
            })?
            .ok_or(EngineError::ConfigMissing)?;
        Ok(())
    }
}

/// Server-side tick driver. Coexists with client-driven ticks through the claim.
///
/// Fires on a fixed period and re-arms when the configured `tickMs` changes.
pub async fn run_ticker(engine: Arc<Engine>) {
    let mut period_ms = ticker_period(&engine);
    let mut interval = ticker_interval(period_ms);
    loop {
        interval.tick().await;

        if let Err(e) = engine.advance() {
            error!("Tick failed: {}", e);
        }

        let next = ticker_period(&engine);
        if next != period_ms {
            debug!("Ticker period {}ms -> {}ms", period_ms, next);
            period_ms = next;
            interval = ticker_interval(period_ms);
        }
    }
}

fn ticker_period(engine: &Engine) -> u32 {
    match engine.config() {
        Ok(config) => config.tick_ms,
        Err(e) => {
            error!("Ticker could not read config: {}", e);
            DEFAULT_TICK_MS
        }
    }
}

/// Interval whose first tick is one period out. Late ticks push the schedule back.
fn ticker_interval(period_ms: u32) -> Interval {
    let period = Duration::from_millis(period_ms as u64);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Whether stepping along `dir` would land the head on the segment behind it
fn turns_onto_neck(player: &Player, dir: Direction, config: &WorldConfig) -> bool {
    match (player.head(), player.body.get(1)) {
        (Some(head), Some(&neck)) => {
            head.step(dir, config.grid_width, config.grid_height) == neck
        }
        _ => false,
    }
}
