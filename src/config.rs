//! Layout controller configuration.
//!
//! Every setting is plain data threaded into the controller, router and
//! reservation manager at construction. Nothing is read from globals.
//!
//! # Example
//!
//! ```rust
//! use rs_trainz_layout::config::{Config, ReservationConfig, ReservedPolicy, RoutingConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_name("basement")
//!     .with_routing(RoutingConfig::default().with_reserved_policy(ReservedPolicy::Penalize))
//!     .with_reservation(ReservationConfig::default().with_max_leading_blocks(3));
//! ```

use heapless::String as HString;

/// Maximum length for element and layout names
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Name of a layout element or train
pub type Name = ShortString;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    // Take only what fits
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete controller configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Layout name, used in log lines
    pub name: ShortString,
    /// Router configuration
    pub routing: RoutingConfig,
    /// Leading and trailing reservation configuration
    pub reservation: ReservationConfig,
    /// Speeds and state machine configuration
    pub motion: MotionConfig,
    /// Automatic driving configuration
    pub scheduling: SchedulingConfig,
}

impl Config {
    /// Set the layout name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set routing configuration
    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    /// Set reservation configuration
    pub fn with_reservation(mut self, reservation: ReservationConfig) -> Self {
        self.reservation = reservation;
        self
    }

    /// Set motion configuration
    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Set scheduling configuration
    pub fn with_scheduling(mut self, scheduling: SchedulingConfig) -> Self {
        self.scheduling = scheduling;
        self
    }
}

// ============================================================================
// Routing Config
// ============================================================================

/// How the router treats blocks and turnouts reserved by another train.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReservedPolicy {
    /// Never route through them.
    #[default]
    Exclude,
    /// Route through them only when nothing else reaches the destination.
    Penalize,
}

/// Shortest-path router configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingConfig {
    /// Treatment of resources held by other trains
    pub reserved_policy: ReservedPolicy,
    /// Cost added per reserved element under [`ReservedPolicy::Penalize`]
    pub reserved_penalty: f64,
    /// Length used for blocks with no or zero length (cm)
    pub fallback_block_length: f64,
    /// Length used for turnouts with no or zero length (cm)
    pub fallback_turnout_length: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            reserved_policy: ReservedPolicy::Exclude,
            reserved_penalty: 100_000.0,
            fallback_block_length: 100.0,
            fallback_turnout_length: 10.0,
        }
    }
}

impl RoutingConfig {
    /// Set the reserved resource policy
    pub fn with_reserved_policy(mut self, policy: ReservedPolicy) -> Self {
        self.reserved_policy = policy;
        self
    }

    /// Set the penalty per reserved element
    pub fn with_reserved_penalty(mut self, penalty: f64) -> Self {
        self.reserved_penalty = penalty.max(0.0);
        self
    }

    /// Set fallback lengths for blocks and turnouts
    pub fn with_fallback_lengths(mut self, block: f64, turnout: f64) -> Self {
        self.fallback_block_length = block.max(0.0);
        self.fallback_turnout_length = turnout.max(0.0);
        self
    }
}

// ============================================================================
// Reservation Config
// ============================================================================

/// Leading and trailing reservation configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservationConfig {
    /// Number of blocks reserved ahead of a moving train
    pub max_leading_blocks: usize,
    /// Distance a train needs to stop from full speed (cm)
    pub stopping_distance: f64,
    /// Keep blocks behind the head reserved until the train length clears them
    pub keep_trailing_blocks: bool,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            max_leading_blocks: 2,
            stopping_distance: 0.0,
            keep_trailing_blocks: true,
        }
    }
}

impl ReservationConfig {
    /// Set the number of leading blocks (capped at the hard maximum)
    pub fn with_max_leading_blocks(mut self, count: usize) -> Self {
        self.max_leading_blocks = count.min(crate::layout::MAX_LEADING_BLOCKS);
        self
    }

    /// Set the stopping distance
    pub fn with_stopping_distance(mut self, cm: f64) -> Self {
        self.stopping_distance = cm.max(0.0);
        self
    }

    /// Set whether trailing blocks stay reserved
    pub fn with_keep_trailing_blocks(mut self, keep: bool) -> Self {
        self.keep_trailing_blocks = keep;
        self
    }
}

// ============================================================================
// Motion Config
// ============================================================================

/// Speeds and state machine configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionConfig {
    /// Speed while braking (km/h)
    pub braking_kph: u16,
    /// Speed cap for limited blocks, branches and unsettled paths (km/h)
    pub limited_kph: u16,
    /// Only accept the next expected feedback
    pub strict_feedback: bool,
    /// Stop every train when a feedback no train expects is detected
    pub detect_unexpected_feedback: bool,
    /// Upper bound on cascade steps per external event
    pub max_cascade_steps: usize,
    /// The command station reports actual speeds. When false, a stopping
    /// train counts as stopped as soon as speed 0 is commanded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub speed_feedback: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            braking_kph: 20,
            limited_kph: 40,
            strict_feedback: false,
            detect_unexpected_feedback: false,
            max_cascade_steps: 1000,
            speed_feedback: false,
        }
    }
}

impl MotionConfig {
    /// Set the braking speed
    pub fn with_braking_kph(mut self, kph: u16) -> Self {
        self.braking_kph = kph;
        self
    }

    /// Set the limited speed
    pub fn with_limited_kph(mut self, kph: u16) -> Self {
        self.limited_kph = kph;
        self
    }

    /// Enable or disable strict feedback handling
    pub fn with_strict_feedback(mut self, strict: bool) -> Self {
        self.strict_feedback = strict;
        self
    }

    /// Enable or disable unexpected feedback detection
    pub fn with_detect_unexpected_feedback(mut self, detect: bool) -> Self {
        self.detect_unexpected_feedback = detect;
        self
    }

    /// Enable or disable waiting for reported standstill
    pub fn with_speed_feedback(mut self, reported: bool) -> Self {
        self.speed_feedback = reported;
        self
    }

    /// Set the cascade step cap (minimum 1)
    pub fn with_max_cascade_steps(mut self, steps: usize) -> Self {
        self.max_cascade_steps = steps.max(1);
        self
    }
}

// ============================================================================
// Scheduling Config
// ============================================================================

/// Automatic driving configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulingConfig {
    /// Station wait for blocks without their own wait time (seconds)
    pub default_station_wait_secs: u32,
    /// Re-run the router when an automatic train is stuck
    pub automatic_reroute: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_station_wait_secs: 10,
            automatic_reroute: true,
        }
    }
}

impl SchedulingConfig {
    /// Set the default station wait
    pub fn with_default_station_wait_secs(mut self, secs: u32) -> Self {
        self.default_station_wait_secs = secs;
        self
    }

    /// Enable or disable automatic rerouting
    pub fn with_automatic_reroute(mut self, enabled: bool) -> Self {
        self.automatic_reroute = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Config Tests
    // =========================================================================

    #[test]
    fn config_default() {
        let config = Config::default();
        assert!(config.name.is_empty());
        assert_eq!(config.routing.reserved_policy, ReservedPolicy::Exclude);
        assert_eq!(config.reservation.max_leading_blocks, 2);
        assert!(!config.motion.strict_feedback);
        assert_eq!(config.reservation.stopping_distance, 0.0);
    }

    #[test]
    fn config_builder() {
        let config = Config::default()
            .with_name("club")
            .with_motion(MotionConfig::default().with_braking_kph(15))
            .with_scheduling(SchedulingConfig::default().with_automatic_reroute(false));

        assert_eq!(config.name.as_str(), "club");
        assert_eq!(config.motion.braking_kph, 15);
        assert!(!config.scheduling.automatic_reroute);
    }

    // =========================================================================
    // Section Tests
    // =========================================================================

    #[test]
    fn leading_blocks_capped() {
        let config = ReservationConfig::default().with_max_leading_blocks(1000);
        assert_eq!(config.max_leading_blocks, crate::layout::MAX_LEADING_BLOCKS);
    }

    #[test]
    fn negative_lengths_clamped() {
        let routing = RoutingConfig::default()
            .with_fallback_lengths(-1.0, -2.0)
            .with_reserved_penalty(-5.0);
        assert_eq!(routing.fallback_block_length, 0.0);
        assert_eq!(routing.fallback_turnout_length, 0.0);
        assert_eq!(routing.reserved_penalty, 0.0);

        let reservation = ReservationConfig::default().with_stopping_distance(-10.0);
        assert_eq!(reservation.stopping_distance, 0.0);
    }

    #[test]
    fn cascade_cap_is_positive() {
        let motion = MotionConfig::default().with_max_cascade_steps(0);
        assert_eq!(motion.max_cascade_steps, 1);
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(200);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        // Each character is 4 bytes
        let input = "\u{1F682}".repeat(20);
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
