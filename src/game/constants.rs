/// Tick cadence and debounce constants
pub mod tick {
    /// Grace subtracted from `tick_ms` when deciding whether a tick is due.
    /// Client timers drift, so a call arriving slightly early still advances.
    pub const DEBOUNCE_SLACK_MS: i64 = 5;
    /// Lowest accepted tick interval
    pub const MIN_TICK_MS: u32 = 30;
    /// Default tick interval for a freshly created world
    pub const DEFAULT_TICK_MS: u32 = 120;
}

/// Playfield constants
pub mod world {
    /// Key of the singleton world record
    pub const GLOBAL_KEY: &str = "global";
    /// Smallest grid edge accepted by config
    pub const MIN_GRID_DIMENSION: u32 = 8;
    pub const DEFAULT_GRID_WIDTH: u32 = 40;
    pub const DEFAULT_GRID_HEIGHT: u32 = 28;
}

/// Population policy constants
pub mod population {
    /// Players not seen for longer than this are deleted by the next tick
    pub const INACTIVITY_TIMEOUT_MS: i64 = 5_000;
    pub const DEFAULT_MAX_FRUITS: u32 = 6;
    pub const DEFAULT_TARGET_BOTS: u32 = 3;

    /// Fruit targets by player count: (inclusive upper bound, desired fruits)
    pub const FRUIT_STEPS: [(usize, usize); 3] = [(0, 1), (3, 2), (10, 4)];
    /// Desired fruits once the player count exceeds the last step
    pub const FRUIT_CEILING: usize = 5;
}

/// Bot controller constants
pub mod bot {
    /// Chance per tick that a living bot picks a new heading
    pub const TURN_PROBABILITY: f64 = 0.25;
    /// Session ids of bots start with this prefix
    pub const SESSION_PREFIX: &str = "bot-";
    /// Random suffix length of a bot session id
    pub const SESSION_SUFFIX_LEN: usize = 6;
}

/// Super-fruit constants
pub mod super_fruit {
    /// Chance that a freshly spawned fruit is a super-fruit
    pub const SPAWN_CHANCE: f64 = 0.1;
}

/// Player naming and appearance
pub mod player {
    pub const MAX_NAME_LEN: usize = 20;
    pub const DEFAULT_NAME: &str = "Anonymous";
    /// Colors handed out when a client does not pick one
    pub const PALETTE: [&str; 8] = [
        "#e74c3c", "#3498db", "#2ecc71", "#9b59b6", "#f1c40f", "#e67e22", "#1abc9c", "#e84393",
    ];
}
