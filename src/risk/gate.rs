//! Single-flight admission per instrument.
//!
//! Two overlapping evaluations of the same instrument could both see a dip and
//! both enter. The gate admits one evaluation per key at a time and rejects the
//! rest instead of queueing them.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Set of instrument keys currently being evaluated.
#[derive(Debug, Default, Clone)]
pub struct InstrumentGate {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Held while an evaluation runs; releases the key on drop.
#[derive(Debug)]
pub struct GateGuard {
    key: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl InstrumentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `key` unless an evaluation for it is already running.
    pub fn try_acquire(&self, key: &str) -> Option<GateGuard> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(key.to_string()) {
            debug!(key, "Evaluation already in flight");
            return None;
        }

        Some(GateGuard {
            key: key.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_per_key() {
        let gate = InstrumentGate::new();

        let guard = gate.try_acquire("linear:BTCUSDT").unwrap();
        assert!(gate.try_acquire("linear:BTCUSDT").is_none());
        assert!(gate.try_acquire("linear:ETHUSDT").is_some());
        assert_eq!(gate.in_flight_count(), 1);

        drop(guard);
        assert_eq!(gate.in_flight_count(), 0);
        assert!(gate.try_acquire("linear:BTCUSDT").is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = InstrumentGate::new();
        let other = gate.clone();

        let _guard = gate.try_acquire("spot:BTCUSDT").unwrap();
        assert!(other.try_acquire("spot:BTCUSDT").is_none());
    }
}
