//! Per-key request intensity tracking.

use std::collections::HashMap;
use std::sync::RwLock;

/// Decaying request-rate estimate for one key.
#[derive(Debug, Clone, Copy)]
struct HotKeyEntry {
    /// Exponentially-weighted count of recent requests.
    moving_average: f64,

    /// The whole second the key was last observed in.
    last_second: i64,
}

/// Estimates per-key request rates and flags keys hot enough to bypass
/// their hash assignment.
///
/// The estimate decays across whole-second buckets: requests within the
/// same second each add 1, and a gap of `n` seconds first scales the
/// average by `smoothing^n`. A key is flagged when its average, as it
/// stood *before* the current observation, has reached the threshold.
///
/// Entries are never purged; a cold key's average decays toward zero but
/// its entry stays resident. Under adversarial key churn this map grows
/// without bound - an accepted trade for the operating horizons this
/// design targets.
pub struct HotKeyTracker {
    threshold: f64,
    smoothing: f64,
    keys: RwLock<HashMap<String, HotKeyEntry>>,
}

impl std::fmt::Debug for HotKeyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotKeyTracker")
            .field("threshold", &self.threshold)
            .field("smoothing", &self.smoothing)
            .field("tracked", &self.keys.read().unwrap().len())
            .finish()
    }
}

impl HotKeyTracker {
    /// Construct a tracker. `smoothing` is the per-second decay factor
    /// in (0, 1); `threshold` is the average at which a key disperses.
    pub fn new(threshold: f64, smoothing: f64) -> Self {
        Self {
            threshold,
            smoothing,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Record an observation of `key` during `now_second`, returning
    /// true when the key should be dispersed instead of routed by hash.
    pub fn observe(&self, key: &str, now_second: i64) -> bool {
        use std::collections::hash_map::Entry;

        let mut keys = self.keys.write().unwrap();

        let mut entry = match keys.entry(key.to_string()) {
            Entry::Vacant(e) => {
                e.insert(HotKeyEntry {
                    moving_average: 1.0,
                    last_second: now_second,
                });
                return false;
            }
            Entry::Occupied(e) => e,
        };
        let entry = entry.get_mut();

        let disperse = entry.moving_average >= self.threshold;

        if entry.last_second == now_second {
            entry.moving_average += 1.0;
        } else {
            let elapsed = (now_second - entry.last_second) as f64;
            entry.moving_average =
                entry.moving_average * self.smoothing.powf(elapsed) + 1.0;
            entry.last_second = now_second;
        }

        disperse
    }
}
