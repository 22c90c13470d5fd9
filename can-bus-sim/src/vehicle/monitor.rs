//! Intrusion state machine
//!
//! Counts high-priority and fuel-kill traffic per accounting window and moves
//! the operating mode between `Normal`, `DosDetected` and `EngineShutdown`:
//!
//! - `Normal → DosDetected` as soon as the high-priority count of the current
//!   window reaches the threshold
//! - `DosDetected → Normal` at a window boundary, if the closed window stayed
//!   below the threshold
//! - `Normal → EngineShutdown` as soon as the fuel-kill count of the current
//!   window reaches the threshold; there is no way back
//!
//! Only one boundary is processed per event, even when the gap since the last
//! event spans several windows.

use crate::types::{Event, EventKind};
use crate::vehicle::state::{ModeTransition, OperatingMode};

/// Fuel-kill values at or above this level request the engine to stop
pub const FUEL_KILL_ENGAGE_LEVEL: f64 = 0.5;

/// Rolling window counters and the operating mode they drive
#[derive(Debug, Clone)]
pub struct IntrusionMonitor {
    mode: OperatingMode,
    threshold: u32,
    window_length: f64,
    window_start: f64,
    high_priority_msg_count: u32,
    overload_msg_count: u32,
}

impl IntrusionMonitor {
    /// Create a monitor in `Normal` mode with the window starting at 0
    pub fn new(threshold: u32, window_length: f64) -> Self {
        Self {
            mode: OperatingMode::Normal,
            threshold,
            window_length,
            window_start: 0.0,
            high_priority_msg_count: 0,
            overload_msg_count: 0,
        }
    }

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Start of the current window
    pub fn window_start(&self) -> f64 {
        self.window_start
    }

    /// High-priority messages seen in the current window
    pub fn high_priority_msg_count(&self) -> u32 {
        self.high_priority_msg_count
    }

    /// Fuel-kill engage messages seen in the current window
    pub fn overload_msg_count(&self) -> u32 {
        self.overload_msg_count
    }

    /// Account for one event and return any mode changes it caused
    pub fn observe(&mut self, event: &Event) -> Vec<ModeTransition> {
        let mut transitions = Vec::new();

        if event.timestamp - self.window_start >= self.window_length {
            if let Some(transition) = self.close_window(event.timestamp) {
                transitions.push(transition);
            }
        }

        if event.kind.is_high_priority() {
            self.high_priority_msg_count += 1;
        } else if event.kind == EventKind::FuelKill && event.value >= FUEL_KILL_ENGAGE_LEVEL {
            self.overload_msg_count += 1;
        }

        if self.mode == OperatingMode::Normal {
            if self.overload_msg_count >= self.threshold {
                transitions.push(self.enter(OperatingMode::EngineShutdown, event.timestamp));
                log::warn!(
                    "Engine shut down at t={:.3}s: {} fuel-kill commands in window starting {:.3}s",
                    event.timestamp,
                    self.overload_msg_count,
                    self.window_start
                );
            } else if self.high_priority_msg_count >= self.threshold {
                transitions.push(self.enter(OperatingMode::DosDetected, event.timestamp));
                log::warn!(
                    "DoS detected at t={:.3}s: {} high-priority messages in window starting {:.3}s",
                    event.timestamp,
                    self.high_priority_msg_count,
                    self.window_start
                );
            }
        }

        transitions
    }

    /// Evaluate the closed window, then reset counters and realign the window
    fn close_window(&mut self, timestamp: f64) -> Option<ModeTransition> {
        let transition = if self.mode == OperatingMode::DosDetected
            && self.high_priority_msg_count < self.threshold
        {
            log::info!(
                "DoS cleared at t={:.3}s: {} high-priority messages in closed window",
                timestamp,
                self.high_priority_msg_count
            );
            Some(self.enter(OperatingMode::Normal, timestamp))
        } else {
            None
        };

        log::trace!(
            "Window {:.3}s closed: high_priority={}, overload={}",
            self.window_start,
            self.high_priority_msg_count,
            self.overload_msg_count
        );

        self.high_priority_msg_count = 0;
        self.overload_msg_count = 0;
        self.window_start = (timestamp / self.window_length).floor() * self.window_length;

        transition
    }

    fn enter(&mut self, to: OperatingMode, timestamp: f64) -> ModeTransition {
        let from = self.mode;
        self.mode = to;
        ModeTransition {
            timestamp,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(t: f64) -> Event {
        Event::new(EventKind::BusDiagnostic, t, 0.0)
    }

    #[test]
    fn test_dos_detected_mid_window() {
        let mut monitor = IntrusionMonitor::new(100, 1.0);
        for i in 0..99 {
            assert!(monitor.observe(&diag(i as f64 * 0.001)).is_empty());
        }
        let transitions = monitor.observe(&diag(0.5));
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to, OperatingMode::DosDetected);
        assert_eq!(monitor.mode(), OperatingMode::DosDetected);
    }

    #[test]
    fn test_recovery_needs_a_quiet_window() {
        let mut monitor = IntrusionMonitor::new(10, 1.0);
        for i in 0..15 {
            monitor.observe(&diag(0.1 + i as f64 * 0.01));
        }
        assert_eq!(monitor.mode(), OperatingMode::DosDetected);

        // Boundary closing the burst window: count 15 ≥ 10, stay
        monitor.observe(&Event::new(EventKind::Idle, 1.2, 0.0));
        assert_eq!(monitor.mode(), OperatingMode::DosDetected);
        assert_eq!(monitor.high_priority_msg_count(), 0);

        // Boundary closing the quiet window: recover
        let transitions = monitor.observe(&Event::new(EventKind::Idle, 2.0, 0.0));
        assert_eq!(transitions[0].to, OperatingMode::Normal);
        assert_eq!(monitor.mode(), OperatingMode::Normal);
    }

    #[test]
    fn test_fuel_kill_only_counts_engage() {
        let mut monitor = IntrusionMonitor::new(3, 1.0);
        for i in 0..10 {
            monitor.observe(&Event::new(EventKind::FuelKill, 0.1 + i as f64 * 0.01, 0.0));
        }
        assert_eq!(monitor.overload_msg_count(), 0);
        assert_eq!(monitor.mode(), OperatingMode::Normal);

        for i in 0..3 {
            monitor.observe(&Event::new(EventKind::FuelKill, 0.5 + i as f64 * 0.01, 1.0));
        }
        assert_eq!(monitor.mode(), OperatingMode::EngineShutdown);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut monitor = IntrusionMonitor::new(1, 1.0);
        monitor.observe(&Event::new(EventKind::FuelKill, 0.0, 1.0));
        assert_eq!(monitor.mode(), OperatingMode::EngineShutdown);

        for t in 1..10 {
            monitor.observe(&diag(t as f64));
            monitor.observe(&Event::new(EventKind::Idle, t as f64 + 0.5, 0.0));
            assert_eq!(monitor.mode(), OperatingMode::EngineShutdown);
        }
    }

    #[test]
    fn test_single_reset_for_sparse_events() {
        let mut monitor = IntrusionMonitor::new(100, 1.0);
        monitor.observe(&Event::new(EventKind::Idle, 0.2, 0.0));
        monitor.observe(&Event::new(EventKind::Idle, 5.7, 0.0));
        // Jumps straight to the window containing the event
        assert_eq!(monitor.window_start(), 5.0);
    }

    #[test]
    fn test_counters_reset_at_boundary() {
        let mut monitor = IntrusionMonitor::new(100, 1.0);
        monitor.observe(&diag(0.1));
        monitor.observe(&Event::new(EventKind::FuelKill, 0.2, 1.0));
        assert_eq!(monitor.high_priority_msg_count(), 1);
        assert_eq!(monitor.overload_msg_count(), 1);

        monitor.observe(&Event::new(EventKind::Idle, 1.0, 0.0));
        assert_eq!(monitor.high_priority_msg_count(), 0);
        assert_eq!(monitor.overload_msg_count(), 0);
        assert_eq!(monitor.window_start(), 1.0);
    }
}
