//! Configuration for the [MdsMonitor](crate::monitor::MdsMonitor).

use std::time::Duration;

/// Recognized options.
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial `target_num` written into the first map.
    pub num_mds: u32,

    /// Failure-detection threshold: an up server with no beacon for this
    /// long is marked down by the next tick.
    pub beacon_grace: Duration,

    /// Whether a booting server may evict an existing instance that holds
    /// the id it claims.
    pub allow_mds_bully: bool,

    /// Whether to shut the monitor down after the last server stops.
    pub stop_with_last_mds: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_mds: 1,
            beacon_grace: Duration::from_secs(15),
            allow_mds_bully: false,
            stop_with_last_mds: false,
        }
    }
}

impl Config {
    /// Assert that all configuration values are valid.
    pub fn assert(&self) {
        assert_ne!(self.num_mds, 0, "num_mds must be non-zero");
        assert_ne!(
            self.beacon_grace,
            Duration::from_secs(0),
            "beacon_grace must be greater than 0"
        );
    }
}
