use std::time::Duration;

use dotenv::dotenv;

/// Tunables for a [`crate::pool::SharedLruPool`].
///
/// `capacity` is the only knob the original exposes (`NewConnMap(capx)`);
/// `shrink_span`/`high_water_ratio` are broken out here, defaulted to the
/// spec's constants, so tests can run the shrinker on a tight clock instead
/// of waiting on the real 100ms span.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub capacity: usize,
    pub shrink_span: Duration,
    pub high_water_ratio: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            capacity: crate::pool::shared::MAX_CONNS,
            shrink_span: Duration::from_millis(100),
            high_water_ratio: 0.9,
        }
    }
}

impl PoolConfig {
    /// Load `dotenv` (if a `.env` file is present) then read `POOL_CAPACITY`,
    /// `POOL_SHRINK_SPAN_MS` and `POOL_HIGH_WATER_RATIO` from the
    /// environment, falling back to spec defaults for anything unset or
    /// unparsable. Mirrors `Server::run_forever`'s `dotenv().ok()` startup
    /// step.
    pub fn from_env() -> Self {
        dotenv().ok();
        let mut cfg = PoolConfig::default();

        if let Ok(raw) = std::env::var("POOL_CAPACITY") {
            if let Ok(v) = raw.parse() {
                cfg.capacity = v;
            }
        }
        if let Ok(raw) = std::env::var("POOL_SHRINK_SPAN_MS") {
            if let Ok(v) = raw.parse() {
                cfg.shrink_span = Duration::from_millis(v);
            }
        }
        if let Ok(raw) = std::env::var("POOL_HIGH_WATER_RATIO") {
            if let Ok(v) = raw.parse() {
                cfg.high_water_ratio = v;
            }
        }

        cfg.capacity = cfg.capacity.min(crate::pool::shared::MAX_CONNS);
        cfg
    }

    pub fn high_water_mark(&self) -> usize {
        (self.capacity as f64 * self.high_water_ratio) as usize
    }
}

/// Installs a `tracing_subscriber` fmt layer, patterned on
/// `Server::run_forever`'s subscriber setup. Intended for binaries/tests
/// driving the pool standalone; library consumers embedding the pool in a
/// larger service are expected to install their own subscriber instead.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .try_init();
}
