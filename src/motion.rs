//! Train motion state machine.
//!
//! ```text
//!            sufficient, may start
//!  Stopped ──────────────────────────▶ Running
//!     ▲                                 │   ▲
//!     │ actual speed 0     brake point, │   │ sufficient,
//!     │                    stop cause   ▼   │ no stop cause
//!  Stopping ◀──────────────────────── Braking
//!            stop point, stop cause
//! ```
//!
//! A stop cause is an insufficient leading reservation or, for managed
//! trains, a pending managed stop, the end of the route or a station stop.
//! A manual train whose driver sets speed 0 goes straight to `Stopping`.
//!
//! [`next_state`] is pure. [`evaluate`] reads the layout, applies
//! transitions until the state is stable and queues the resulting
//! `StateChanged` events and `SetSpeed` command.

use crate::config::Config;
use crate::error::LayoutError;
use crate::events::{EmergencyReason, LayoutCommand, LayoutEvent, Outbox};
use crate::layout::{Layout, Scheduling, SpeedLimit, Train, TrainId};
use crate::reservation;

/// Motion state of a train.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MotionState {
    /// Not moving.
    #[default]
    Stopped,
    /// Moving at cruising speed.
    Running,
    /// Slowing down before the stop point.
    Braking,
    /// Speed 0 requested, waiting for the locomotive to halt.
    Stopping,
}

impl MotionState {
    /// Returns the state as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MotionState::Stopped => "stopped",
            MotionState::Running => "running",
            MotionState::Braking => "braking",
            MotionState::Stopping => "stopping",
        }
    }
}

/// Everything [`next_state`] looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotionInputs {
    /// Position is at or past the block's brake point.
    pub at_brake: bool,
    /// Position is at or past the block's stop point.
    pub at_stop: bool,
    /// Leading reservation is long enough to run.
    pub reserved_sufficient: bool,
    /// A managed stop cause holds.
    pub stop_requested: bool,
    /// The train may leave a standstill.
    pub may_start: bool,
    /// The driver of a manual train asked for speed 0.
    pub driver_stop: bool,
    /// The locomotive is known to stand still.
    pub standstill: bool,
}

impl MotionInputs {
    fn stop_cause(&self) -> bool {
        !self.reserved_sufficient || self.stop_requested
    }
}

/// One transition of the state machine.
pub fn next_state(state: MotionState, inputs: &MotionInputs) -> MotionState {
    use MotionState::*;
    match state {
        Stopped if inputs.may_start && !inputs.stop_cause() => Running,
        Stopped => Stopped,
        Running | Braking if inputs.driver_stop => Stopping,
        Running if inputs.at_brake && inputs.stop_cause() => Braking,
        Running => Running,
        Braking if !inputs.stop_cause() => Running,
        Braking if inputs.at_stop => Stopping,
        Braking => Braking,
        Stopping if inputs.standstill => Stopped,
        Stopping => Stopping,
    }
}

/// Returns true if the train may leave a standstill.
pub fn may_start(train: &Train) -> bool {
    match train.scheduling {
        Scheduling::Unmanaged => train.requested_kph > 0,
        Scheduling::Managed { .. } => !train.awaiting_restart,
        Scheduling::StopManaged => false,
    }
}

/// Returns true if the train's route ends in its current block.
pub fn at_end_of_route(train: &Train) -> bool {
    train
        .route
        .as_ref()
        .is_some_and(|r| r.is_last_block(train.route_index))
}

/// Seconds a managed train waits in its current block.
pub fn station_wait_secs(layout: &Layout, train: &Train, config: &Config) -> Result<u32, LayoutError> {
    let route_wait = train
        .route
        .as_ref()
        .and_then(|r| r.block_at(train.route_index))
        .and_then(|(_, _, wait)| wait);
    let block_wait = match train.block {
        Some(id) => layout.block(id)?.wait_secs,
        None => None,
    };
    Ok(route_wait
        .or(block_wait)
        .unwrap_or(config.scheduling.default_station_wait_secs))
}

/// Returns true if a managed stop cause holds for the train.
pub fn stop_requested(layout: &Layout, train: &Train, config: &Config) -> Result<bool, LayoutError> {
    let finishing = match train.scheduling {
        Scheduling::Unmanaged => return Ok(false),
        Scheduling::StopManaged => return Ok(true),
        Scheduling::Managed { finishing } => finishing,
    };
    if at_end_of_route(train) {
        return Ok(true);
    }
    let Some(id) = train.block else {
        return Ok(false);
    };
    if !layout.block(id)?.is_station() || train.station_stop_done {
        return Ok(false);
    }
    if finishing || train.route.is_none() {
        return Ok(true);
    }
    Ok(station_wait_secs(layout, train, config)? > 0)
}

/// Gather the state machine inputs for a placed train.
pub fn inputs(layout: &Layout, train: &Train, config: &Config) -> Result<MotionInputs, LayoutError> {
    let (at_brake, at_stop) = match train.block {
        Some(id) => {
            let block = layout.block(id)?;
            let direction = train.travel_direction();
            (
                train.position >= block.brake_position(direction),
                train.position >= block.stop_position(direction),
            )
        }
        None => (true, true),
    };
    Ok(MotionInputs {
        at_brake,
        at_stop,
        reserved_sufficient: reservation::is_sufficient(train, &config.reservation),
        stop_requested: stop_requested(layout, train, config)?,
        may_start: may_start(train),
        driver_stop: train.scheduling == Scheduling::Unmanaged && train.requested_kph == 0,
        standstill: is_standstill(train, config),
    })
}

/// Whether a stopping train may be taken as stopped.
///
/// Without speed feedback the commanded speed is assumed to be reached at
/// once. With it, only a report of 0 received after the last non-zero speed
/// command counts.
pub fn is_standstill(train: &Train, config: &Config) -> bool {
    !config.motion.speed_feedback || train.standstill_reported
}

/// Speed to command in `state`.
pub fn target_speed(
    layout: &Layout,
    train: &Train,
    config: &Config,
    state: MotionState,
) -> Result<u16, LayoutError> {
    let cruise = if train.is_managed() {
        train.max_speed_kph
    } else {
        train.requested_kph
    };
    match state {
        MotionState::Running => {
            let limited = config.motion.limited_kph;
            let mut kph = cruise;
            if let Some(id) = train.block {
                if layout.block(id)?.speed_limit == SpeedLimit::Limited {
                    kph = kph.min(limited);
                }
            }
            if let Some(first) = train.leading.first() {
                for &id in &first.turnouts {
                    let turnout = layout.turnout(id)?;
                    if turnout.speed_limit(turnout.requested_state) == SpeedLimit::Limited {
                        kph = kph.min(limited);
                    }
                }
            }
            if !reservation::is_settled(layout, train, &config.reservation)? {
                kph = kph.min(limited);
            }
            Ok(kph)
        }
        MotionState::Braking => Ok(config.motion.braking_kph.min(cruise)),
        MotionState::Stopping | MotionState::Stopped => Ok(0),
    }
}

/// Run the state machine for a train.
///
/// Returns the new state if it changed.
pub fn evaluate(
    layout: &mut Layout,
    config: &Config,
    train: TrainId,
    out: &mut Outbox,
) -> Result<Option<MotionState>, LayoutError> {
    let t = layout.train(train)?;
    if !t.is_placed() {
        return Ok(None);
    }

    let inputs = inputs(layout, t, config)?;
    let from = t.state;
    let mut state = from;
    // Four states, so four steps always reach a stable one
    for _ in 0..4 {
        let next = next_state(state, &inputs);
        if next == state {
            break;
        }
        log::info!("{train}: {} -> {}", state.as_str(), next.as_str());
        out.event(LayoutEvent::StateChanged {
            train,
            from: state,
            to: next,
        });
        state = next;
    }
    let kph = target_speed(layout, t, config, state)?;

    let t = layout.train_mut(train)?;
    t.state = state;
    if t.commanded_kph != kph {
        if kph > 0 {
            t.standstill_reported = false;
        }
        t.commanded_kph = kph;
        out.command(LayoutCommand::SetSpeed { train, kph });
    }
    Ok((state != from).then_some(state))
}

/// Stop a train outside the normal braking sequence.
///
/// A moving train goes to `Stopping`. Speed 0 is commanded in every case
/// and the train does not start again on its own: a manual train's requested
/// speed drops to 0, a managed train is handed a managed stop.
pub fn emergency_stop(
    layout: &mut Layout,
    train: TrainId,
    reason: EmergencyReason,
    out: &mut Outbox,
) -> Result<(), LayoutError> {
    let t = layout.train_mut(train)?;
    log::warn!("{train}: emergency stop ({reason:?})");
    let from = t.state;
    if matches!(from, MotionState::Running | MotionState::Braking) {
        t.state = MotionState::Stopping;
        out.event(LayoutEvent::StateChanged {
            train,
            from,
            to: MotionState::Stopping,
        });
    }
    match t.scheduling {
        Scheduling::Unmanaged => t.requested_kph = 0,
        Scheduling::Managed { .. } => t.scheduling = Scheduling::StopManaged,
        Scheduling::StopManaged => {}
    }
    t.commanded_kph = 0;
    out.command(LayoutCommand::SetSpeed { train, kph: 0 });
    out.event(LayoutEvent::EmergencyStop { train, reason });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use MotionState::*;

    fn running_ok() -> MotionInputs {
        MotionInputs {
            reserved_sufficient: true,
            may_start: true,
            ..Default::default()
        }
    }

    #[test]
    fn starts_when_reserved_and_allowed() {
        assert_eq!(next_state(Stopped, &running_ok()), Running);

        let not_allowed = MotionInputs {
            may_start: false,
            ..running_ok()
        };
        assert_eq!(next_state(Stopped, &not_allowed), Stopped);

        let short = MotionInputs {
            reserved_sufficient: false,
            ..running_ok()
        };
        assert_eq!(next_state(Stopped, &short), Stopped);

        let managed_stop = MotionInputs {
            stop_requested: true,
            ..running_ok()
        };
        assert_eq!(next_state(Stopped, &managed_stop), Stopped);
    }

    #[test]
    fn brakes_only_at_brake_point() {
        let short = MotionInputs {
            reserved_sufficient: false,
            ..running_ok()
        };
        assert_eq!(next_state(Running, &short), Running);

        let at_brake = MotionInputs {
            at_brake: true,
            ..short
        };
        assert_eq!(next_state(Running, &at_brake), Braking);

        // No stop cause: keep running past the brake point
        let clear = MotionInputs {
            at_brake: true,
            ..running_ok()
        };
        assert_eq!(next_state(Running, &clear), Running);
    }

    #[test]
    fn braking_resolves_either_way() {
        let recovered = MotionInputs {
            at_brake: true,
            ..running_ok()
        };
        assert_eq!(next_state(Braking, &recovered), Running);

        let at_stop = MotionInputs {
            at_brake: true,
            at_stop: true,
            stop_requested: true,
            ..running_ok()
        };
        assert_eq!(next_state(Braking, &at_stop), Stopping);

        let before_stop = MotionInputs {
            at_stop: false,
            ..at_stop
        };
        assert_eq!(next_state(Braking, &before_stop), Braking);
    }

    #[test]
    fn stopping_waits_for_zero_speed() {
        assert_eq!(next_state(Stopping, &MotionInputs::default()), Stopping);
        let stopped = MotionInputs {
            standstill: true,
            ..Default::default()
        };
        assert_eq!(next_state(Stopping, &stopped), Stopped);
    }

    #[test]
    fn driver_stop_skips_braking() {
        let inputs = MotionInputs {
            driver_stop: true,
            ..running_ok()
        };
        assert_eq!(next_state(Running, &inputs), Stopping);
        assert_eq!(next_state(Braking, &inputs), Stopping);
    }

    #[test]
    fn may_start_per_mode() {
        let mut train = Train::new("t");
        assert!(!may_start(&train));
        train.requested_kph = 30;
        assert!(may_start(&train));

        train.scheduling = Scheduling::Managed { finishing: false };
        assert!(may_start(&train));
        train.awaiting_restart = true;
        assert!(!may_start(&train));

        train.scheduling = Scheduling::StopManaged;
        train.awaiting_restart = false;
        assert!(!may_start(&train));
    }

    fn placed_on_line() -> (Layout, TrainId) {
        use crate::direction::{self, BlockDirection};
        use crate::layout::{Block, BlockReservation, SocketRef};

        let mut layout = Layout::new();
        let a = layout.add_block(Block::new("a").with_length(100.0));
        let b = layout.add_block(Block::new("b").with_length(100.0));
        layout
            .link(SocketRef::block_next(a), SocketRef::block_previous(b))
            .unwrap();
        let train = layout.add_train(Train::new("t"));
        layout.block_mut(a).unwrap().reservation = Some(BlockReservation {
            train,
            direction: BlockDirection::Next,
        });
        let t = layout.train_mut(train).unwrap();
        t.block = Some(a);
        t.orientation = direction::resolve(
            t.locomotive_direction,
            BlockDirection::Next.entry_socket(),
            true,
        );
        (layout, train)
    }

    #[test]
    fn evaluate_runs_and_stops_manual_train() {
        let (mut layout, train) = placed_on_line();
        let config = Config::default();
        let mut out = Outbox::new();

        layout.train_mut(train).unwrap().requested_kph = 40;
        reservation::reserve_leading_blocks(&mut layout, train, 1, &mut out).unwrap();
        let mut out = Outbox::new();
        assert_eq!(evaluate(&mut layout, &config, train, &mut out).unwrap(), Some(Running));
        assert_eq!(out.commands, vec![LayoutCommand::SetSpeed { train, kph: 40 }]);

        // Nothing changed: nothing to say
        let mut again = Outbox::new();
        assert_eq!(evaluate(&mut layout, &config, train, &mut again).unwrap(), None);
        assert!(again.is_empty());

        layout.train_mut(train).unwrap().requested_kph = 0;
        let mut out = Outbox::new();
        assert_eq!(evaluate(&mut layout, &config, train, &mut out).unwrap(), Some(Stopped));
        assert_eq!(out.commands, vec![LayoutCommand::SetSpeed { train, kph: 0 }]);
        assert_eq!(out.events.len(), 2);
    }

    #[test]
    fn emergency_stop_commands_zero() {
        let (mut layout, train) = placed_on_line();
        let t = layout.train_mut(train).unwrap();
        t.state = Running;
        t.requested_kph = 40;
        let mut out = Outbox::new();
        emergency_stop(&mut layout, train, EmergencyReason::NoNextBlock, &mut out).unwrap();

        assert_eq!(layout.train(train).unwrap().state, Stopping);
        assert_eq!(layout.train(train).unwrap().requested_kph, 0);
        assert_eq!(out.commands, vec![LayoutCommand::SetSpeed { train, kph: 0 }]);
        assert!(out.events.contains(&LayoutEvent::EmergencyStop {
            train,
            reason: EmergencyReason::NoNextBlock
        }));
    }

    #[test]
    fn emergency_stop_hands_back_managed_train() {
        let (mut layout, train) = placed_on_line();
        let t = layout.train_mut(train).unwrap();
        t.state = Braking;
        t.scheduling = Scheduling::Managed { finishing: false };
        let mut out = Outbox::new();
        emergency_stop(&mut layout, train, EmergencyReason::UnexpectedFeedback, &mut out).unwrap();

        let t = layout.train(train).unwrap();
        assert_eq!(t.scheduling, Scheduling::StopManaged);
        assert!(!may_start(t));
    }

    #[test]
    fn state_names() {
        assert_eq!(Braking.as_str(), "braking");
        assert_eq!(MotionState::default(), Stopped);
    }
}
