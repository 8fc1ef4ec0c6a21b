//! Block and turnout reservation.
//!
//! A placed train always holds the block its head is in. Ahead of it, it
//! holds up to `max_leading_blocks` *leading* blocks together with the
//! turnouts leading into them. Behind it, it keeps the *trailing* elements
//! its body still covers.
//!
//! Leading blocks are re-planned from scratch on every update: the current
//! leading set is released, a new one is planned on the released layout and
//! then committed. The plan stops early instead of failing when it meets an
//! element another train holds, so a crowded layout simply yields shorter
//! reservations.
//!
//! Turnouts are only reserved together with the block that follows them. A
//! turnout whose requested state differs from the one the path needs gets a
//! [`LayoutCommand::SetTurnoutState`].

use crate::config::ReservationConfig;
use crate::direction::{self, BlockDirection};
use crate::error::LayoutError;
use crate::events::{LayoutCommand, LayoutEvent, Outbox};
use crate::layout::{
    BlockCategory, BlockId, BlockReservation, ElementId, LeadingBlock, LeadingReservation, Layout,
    SocketId, Train, TrainId, TurnoutId, TurnoutReservation, TurnoutState,
};
use crate::route::RouteItem;
use crate::visitor::{self, Visit, VisitStep};

/// What an update changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReservationUpdate {
    /// The leading block set changed.
    pub leading_changed: bool,
    /// The settled length changed.
    pub settled_changed: bool,
}

#[derive(Clone, Copy, Debug)]
struct PlannedTurnout {
    turnout: TurnoutId,
    from: SocketId,
    to: SocketId,
    state: TurnoutState,
}

#[derive(Clone, Debug)]
struct PlannedBlock {
    block: BlockId,
    direction: BlockDirection,
    turnouts: Vec<PlannedTurnout>,
}

/// Accumulates leading blocks while walking ahead of a train.
struct Planner<'a> {
    layout: &'a Layout,
    train: &'a Train,
    max_count: usize,
    planned: Vec<PlannedBlock>,
    pending: Vec<PlannedTurnout>,
}

impl<'a> Planner<'a> {
    fn new(layout: &'a Layout, train: &'a Train, max_count: usize) -> Self {
        Self {
            layout,
            train,
            max_count: max_count.min(crate::layout::MAX_LEADING_BLOCKS),
            planned: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Returns false when the walk must end.
    fn turnout(&mut self, planned: PlannedTurnout) -> Result<bool, LayoutError> {
        let turnout = self.layout.turnout(planned.turnout)?;
        if turnout.is_reserved_by_other(self.train.id)
            || self.train.trailing.contains(&ElementId::Turnout(planned.turnout))
            || self
                .pending
                .iter()
                .chain(self.planned.iter().flat_map(|p| p.turnouts.iter()))
                .any(|p| p.turnout == planned.turnout)
        {
            return Ok(false);
        }
        self.pending.push(planned);
        Ok(true)
    }

    /// Returns false when the walk must end.
    fn block(&mut self, id: BlockId, direction: BlockDirection) -> Result<bool, LayoutError> {
        if self.planned.len() >= self.max_count {
            return Ok(false);
        }
        if self.train.block == Some(id)
            || self.train.trailing.contains(&ElementId::Block(id))
            || self.planned.iter().any(|p| p.block == id)
        {
            return Ok(false);
        }

        let block = self.layout.block(id)?;
        if !block.is_available_for(self.train.id) {
            log::trace!("{}: {} not available", self.train.id, id);
            return Ok(false);
        }
        let must_stop = block.category == BlockCategory::Sidetrack
            || (block.is_station() && self.train.is_managed());
        if must_stop {
            if let (Some(available), Some(needed)) = (block.length, self.train.length) {
                if available < needed {
                    log::debug!("{}: {} too short to stop in", self.train.id, id);
                    return Ok(false);
                }
            }
        }

        self.planned.push(PlannedBlock {
            block: id,
            direction,
            turnouts: core::mem::take(&mut self.pending),
        });
        // Nothing follows a siding
        Ok(block.category != BlockCategory::Sidetrack && self.planned.len() < self.max_count)
    }

    /// Plan by following the requested turnout states.
    fn walk_layout(&mut self, from: BlockId, direction: BlockDirection) -> Result<(), LayoutError> {
        let layout = self.layout;
        let mut failure = None;
        visitor::visit(layout, from, direction, None, |step| {
            let outcome = match *step {
                VisitStep::Block { entry: None, .. } | VisitStep::Transition(_) => Ok(true),
                VisitStep::Block {
                    block, direction, ..
                } => self.block(block, direction),
                VisitStep::Turnout {
                    turnout,
                    from,
                    to,
                    state,
                } => self.turnout(PlannedTurnout {
                    turnout,
                    from,
                    to,
                    state,
                }),
            };
            match outcome {
                Ok(true) => Visit::Continue,
                Ok(false) => Visit::Stop,
                Err(err) => {
                    failure = Some(err);
                    Visit::Stop
                }
            }
        })?;
        failure.map_or(Ok(()), Err)
    }

    /// Plan by following the train's route after its current item.
    fn walk_route(&mut self) -> Result<(), LayoutError> {
        let train = self.train;
        let Some(route) = train.route.as_ref() else {
            return Ok(());
        };
        for item in route.items.iter().skip(train.route_index + 1) {
            let proceed = match *item {
                RouteItem::Block {
                    block, direction, ..
                } => self.block(block, direction)?,
                RouteItem::Turnout { turnout, from, to } => {
                    let state = self.layout.turnout(turnout)?.state_for(from, to).ok_or(
                        LayoutError::SocketNotFound {
                            element: ElementId::Turnout(turnout),
                            socket: to,
                        },
                    )?;
                    self.turnout(PlannedTurnout {
                        turnout,
                        from,
                        to,
                        state,
                    })?
                }
            };
            if !proceed {
                break;
            }
        }
        Ok(())
    }
}

fn plan(layout: &Layout, train: TrainId, max_count: usize) -> Result<Vec<PlannedBlock>, LayoutError> {
    let train = layout.train(train)?;
    let Some(block) = train.block else {
        return Ok(Vec::new());
    };
    if max_count == 0 {
        return Ok(Vec::new());
    }
    let mut planner = Planner::new(layout, train, max_count);
    if train.is_managed() && train.route.is_some() {
        planner.walk_route()?;
    } else {
        planner.walk_layout(block, train.travel_direction())?;
    }
    Ok(planner.planned)
}

fn element_length(layout: &Layout, element: ElementId) -> Result<f64, LayoutError> {
    Ok(layout.element_length(element)?.unwrap_or(0.0))
}

fn release_element(layout: &mut Layout, train: TrainId, element: ElementId) -> Result<(), LayoutError> {
    match element {
        ElementId::Block(id) => {
            let block = layout.block_mut(id)?;
            if block.reservation.is_some_and(|r| r.train == train) {
                block.reservation = None;
            }
        }
        ElementId::Turnout(id) => {
            let turnout = layout.turnout_mut(id)?;
            if turnout.reservation.is_some_and(|r| r.train == train) {
                turnout.reservation = None;
            }
        }
    }
    Ok(())
}

/// Release the leading set without emitting anything.
fn release_leading(layout: &mut Layout, train: TrainId) -> Result<LeadingReservation, LayoutError> {
    let leading = core::mem::take(&mut layout.train_mut(train)?.leading);
    for lb in &leading.blocks {
        release_element(layout, train, ElementId::Block(lb.block))?;
        for &turnout in &lb.turnouts {
            release_element(layout, train, ElementId::Turnout(turnout))?;
        }
    }
    Ok(leading)
}

fn commit(
    layout: &mut Layout,
    train: TrainId,
    planned: Vec<PlannedBlock>,
    out: &mut Outbox,
) -> Result<LeadingReservation, LayoutError> {
    let mut leading = LeadingReservation::default();
    for p in planned {
        let mut length = element_length(layout, ElementId::Block(p.block))?;
        layout.block_mut(p.block)?.reservation = Some(BlockReservation {
            train,
            direction: p.direction,
        });
        for t in &p.turnouts {
            length += element_length(layout, ElementId::Turnout(t.turnout))?;
            let turnout = layout.turnout_mut(t.turnout)?;
            turnout.reservation = Some(TurnoutReservation {
                train,
                from: t.from,
                to: t.to,
            });
            if turnout.requested_state != t.state {
                log::debug!("{train}: set {} to {:?}", t.turnout, t.state);
                turnout.requested_state = t.state;
                out.command(LayoutCommand::SetTurnoutState {
                    turnout: t.turnout,
                    state: t.state,
                });
            }
        }
        leading.length += length;
        let entry = LeadingBlock {
            block: p.block,
            direction: p.direction,
            turnouts: p.turnouts.iter().map(|t| t.turnout).collect(),
            length,
        };
        if leading.blocks.push(entry).is_err() {
            break;
        }
    }
    Ok(leading)
}

/// Reserve up to `max_count` blocks ahead of the train.
///
/// Managed trains with a route follow it; every other train follows the
/// requested turnout states. Returns true if the leading set changed, in
/// which case [`LayoutEvent::ReservedBlocksChanged`] was queued.
pub fn reserve_leading_blocks(
    layout: &mut Layout,
    train: TrainId,
    max_count: usize,
    out: &mut Outbox,
) -> Result<bool, LayoutError> {
    if !layout.train(train)?.is_placed() {
        return Ok(false);
    }

    let before = release_leading(layout, train)?;
    let planned = plan(layout, train, max_count)?;
    let mut after = commit(layout, train, planned, out)?;
    after.settled_length = before.settled_length;

    let changed = before.blocks != after.blocks;
    let blocks = after.block_ids();
    layout.train_mut(train)?.leading = after;
    if changed {
        log::debug!("{train}: leading blocks {blocks:?}");
        out.event(LayoutEvent::ReservedBlocksChanged { train, blocks });
    }
    Ok(changed)
}

/// Release every leading block and turnout of the train.
///
/// The current block and the trailing elements stay reserved. Returns true
/// if anything was released.
pub fn release_reservation(
    layout: &mut Layout,
    train: TrainId,
    out: &mut Outbox,
) -> Result<bool, LayoutError> {
    let released = release_leading(layout, train)?;
    if released.is_empty() {
        return Ok(false);
    }
    out.event(LayoutEvent::ReservedBlocksChanged {
        train,
        blocks: Vec::new(),
    });
    if released.settled_length != 0.0 {
        out.event(LayoutEvent::ReservedBlocksSettledLengthChanged {
            train,
            settled_length: 0.0,
        });
    }
    Ok(true)
}

/// Release every element held by the train, including its own block.
pub fn release_all(layout: &mut Layout, train: TrainId) -> Result<(), LayoutError> {
    release_leading(layout, train)?;
    let t = layout.train_mut(train)?;
    let mut held: Vec<ElementId> = core::mem::take(&mut t.trailing);
    held.extend(t.block.map(ElementId::Block));
    for element in held {
        release_element(layout, train, element)?;
    }
    Ok(())
}

/// Release every trailing element of the train.
pub fn release_trailing(layout: &mut Layout, train: TrainId) -> Result<(), LayoutError> {
    let trailing = core::mem::take(&mut layout.train_mut(train)?.trailing);
    for element in trailing {
        release_element(layout, train, element)?;
    }
    Ok(())
}

/// Recompute the settled length: the leading length reachable through
/// turnouts whose actual state matches the requested one.
///
/// Returns true if it changed, in which case
/// [`LayoutEvent::ReservedBlocksSettledLengthChanged`] was queued.
pub fn settle_turnouts(
    layout: &mut Layout,
    train: TrainId,
    out: &mut Outbox,
) -> Result<bool, LayoutError> {
    let t = layout.train(train)?;
    let mut settled = 0.0;
    'blocks: for lb in &t.leading.blocks {
        for &turnout in &lb.turnouts {
            if !layout.turnout(turnout)?.is_settled() {
                break 'blocks;
            }
        }
        settled += lb.length;
    }

    let t = layout.train_mut(train)?;
    if t.leading.settled_length == settled {
        return Ok(false);
    }
    t.leading.settled_length = settled;
    out.event(LayoutEvent::ReservedBlocksSettledLengthChanged {
        train,
        settled_length: settled,
    });
    Ok(true)
}

/// Release trailing elements the train no longer covers.
///
/// Nearest elements are kept until their lengths add up to the train length.
/// An element of unknown length is assumed to cover the rest of the train.
/// Everything is released when the train length is unknown, when the wagons
/// are pushed (they are ahead of the head) or when trailing blocks are not
/// kept at all.
pub fn trim_trailing(
    layout: &mut Layout,
    config: &ReservationConfig,
    train: TrainId,
) -> Result<(), LayoutError> {
    let t = layout.train(train)?;
    let mut keep = 0;
    if let (true, false, Some(needed)) = (config.keep_trailing_blocks, t.wagons_pushed, t.length) {
        let mut covered = 0.0;
        for &element in &t.trailing {
            if covered >= needed {
                break;
            }
            keep += 1;
            covered += match layout.element_length(element)? {
                Some(l) if l > 0.0 => l,
                _ => f64::INFINITY,
            };
        }
    }

    let released = layout.train_mut(train)?.trailing.split_off(keep);
    for element in released {
        release_element(layout, train, element)?;
    }
    Ok(())
}

/// Move the train's head into `block`, entered in `direction` at `position`.
///
/// Blocks and turnouts passed on the way move from the leading set to the
/// front of the trailing list, the orientation is resolved for the entry
/// socket and trailing elements the train no longer covers are released.
pub fn advance_to_block(
    layout: &mut Layout,
    config: &ReservationConfig,
    train: TrainId,
    block: BlockId,
    direction: BlockDirection,
    position: usize,
) -> Result<(), LayoutError> {
    let t = layout.train(train)?;
    let Some(current) = t.block else {
        return Ok(());
    };

    let mut passed = vec![ElementId::Block(current)];
    let mut remaining = LeadingReservation::default();
    match t.leading.blocks.iter().position(|lb| lb.block == block) {
        Some(index) => {
            for (i, lb) in t.leading.blocks.iter().enumerate() {
                if i <= index {
                    passed.extend(lb.turnouts.iter().copied().map(ElementId::Turnout));
                    if i < index {
                        passed.push(ElementId::Block(lb.block));
                    }
                } else {
                    remaining.length += lb.length;
                    let _ = remaining.blocks.push(lb.clone());
                }
            }
            remaining.settled_length = t.leading.settled_length;
        }
        None => {
            let target = layout.block(block)?;
            if let Some(holder) = target.reservation.filter(|r| r.train != train) {
                return Err(LayoutError::BlockOccupied {
                    block,
                    holder: holder.train,
                });
            }
            release_leading(layout, train)?;
        }
    }

    layout.block_mut(block)?.reservation = Some(BlockReservation { train, direction });

    let t = layout.train_mut(train)?;
    passed.reverse();
    passed.extend(t.trailing.drain(..));
    t.trailing = passed;
    t.leading = remaining;
    t.block = Some(block);
    t.position = position;
    t.orientation = direction::resolve(
        t.locomotive_direction,
        direction.entry_socket(),
        t.locomotive_leads_front(),
    );
    t.station_stop_done = false;
    if let Some(index) = t
        .route
        .as_ref()
        .and_then(|r| r.find_block(block, t.route_index + 1))
    {
        t.route_index = index;
    }

    trim_trailing(layout, config, train)
}

/// Length that must be reserved ahead of the train before it may run.
pub fn required_length(train: &Train, config: &ReservationConfig) -> f64 {
    let pushed = if train.wagons_pushed {
        train.length.unwrap_or(0.0)
    } else {
        0.0
    };
    config.stopping_distance + pushed
}

/// Returns true if the leading reservation is long enough to run.
pub fn is_sufficient(train: &Train, config: &ReservationConfig) -> bool {
    !train.leading.is_empty() && train.leading.length >= required_length(train, config)
}

/// Returns true if the sufficient part of the reservation is also settled.
pub fn is_settled(
    layout: &Layout,
    train: &Train,
    config: &ReservationConfig,
) -> Result<bool, LayoutError> {
    let Some(first) = train.leading.first() else {
        return Ok(false);
    };
    for &turnout in &first.turnouts {
        if !layout.turnout(turnout)?.is_settled() {
            return Ok(false);
        }
    }
    Ok(train.leading.settled_length >= required_length(train, config))
}

/// Refresh the train's reservation.
///
/// A train that is moving or may start gets its leading blocks re-planned,
/// a stopped train that may not start holds only what it physically covers.
pub fn update(
    layout: &mut Layout,
    config: &ReservationConfig,
    train: TrainId,
    may_run: bool,
    out: &mut Outbox,
) -> Result<ReservationUpdate, LayoutError> {
    let t = layout.train(train)?;
    if !t.is_placed() {
        return Ok(ReservationUpdate::default());
    }
    let leading_changed = if t.is_moving() || may_run {
        reserve_leading_blocks(layout, train, config.max_leading_blocks, out)?
    } else {
        release_reservation(layout, train, out)?
    };
    let settled_changed = settle_turnouts(layout, train, out)?;
    Ok(ReservationUpdate {
        leading_changed,
        settled_changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Block, SocketRef, Turnout, TurnoutCategory};

    /// a -> b -> c in a line, train on a heading next
    fn line() -> (Layout, [BlockId; 3], TrainId) {
        let mut layout = Layout::new();
        let a = layout.add_block(Block::new("a").with_length(100.0));
        let b = layout.add_block(Block::new("b").with_length(100.0));
        let c = layout.add_block(Block::new("c").with_length(100.0));
        layout
            .link(SocketRef::block_next(a), SocketRef::block_previous(b))
            .unwrap();
        layout
            .link(SocketRef::block_next(b), SocketRef::block_previous(c))
            .unwrap();
        let train = layout.add_train(Train::new("t"));
        place(&mut layout, train, a);
        (layout, [a, b, c], train)
    }

    fn place(layout: &mut Layout, train: TrainId, block: BlockId) {
        layout.block_mut(block).unwrap().reservation = Some(BlockReservation {
            train,
            direction: BlockDirection::Next,
        });
        let t = layout.train_mut(train).unwrap();
        t.block = Some(block);
        t.orientation = direction::resolve(
            t.locomotive_direction,
            BlockDirection::Next.entry_socket(),
            true,
        );
    }

    #[test]
    fn reserves_up_to_max_count() {
        let (mut layout, [_, b, c], train) = line();
        let mut out = Outbox::new();

        assert!(reserve_leading_blocks(&mut layout, train, 1, &mut out).unwrap());
        assert_eq!(layout.train(train).unwrap().leading.block_ids(), vec![b]);
        assert!(layout.block(c).unwrap().reservation.is_none());

        assert!(reserve_leading_blocks(&mut layout, train, 5, &mut out).unwrap());
        assert_eq!(layout.train(train).unwrap().leading.block_ids(), vec![b, c]);
        assert_eq!(layout.train(train).unwrap().leading.length, 200.0);
    }

    #[test]
    fn zero_count_reserves_nothing() {
        let (mut layout, _, train) = line();
        let mut out = Outbox::new();
        assert!(!reserve_leading_blocks(&mut layout, train, 0, &mut out).unwrap());
        assert!(layout.train(train).unwrap().leading.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn replanning_same_set_reports_no_change() {
        let (mut layout, _, train) = line();
        let mut out = Outbox::new();
        assert!(reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap());
        let events = out.events.len();
        assert!(!reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap());
        assert_eq!(out.events.len(), events);
    }

    #[test]
    fn stops_at_other_trains_block() {
        let (mut layout, [_, b, c], train) = line();
        let other = layout.add_train(Train::new("o"));
        place(&mut layout, other, c);

        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 5, &mut out).unwrap();
        assert_eq!(layout.train(train).unwrap().leading.block_ids(), vec![b]);
        assert_eq!(layout.block(c).unwrap().reservation.unwrap().train, other);
    }

    #[test]
    fn disabled_block_ends_walk() {
        let (mut layout, [_, b, _], train) = line();
        layout.block_mut(b).unwrap().enabled = false;
        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 5, &mut out).unwrap();
        assert!(layout.train(train).unwrap().leading.is_empty());
    }

    #[test]
    fn release_keeps_current_block() {
        let (mut layout, [a, b, _], train) = line();
        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap();
        assert!(release_reservation(&mut layout, train, &mut out).unwrap());

        assert!(layout.block(b).unwrap().reservation.is_none());
        assert_eq!(layout.block(a).unwrap().reservation.unwrap().train, train);
        assert!(!release_reservation(&mut layout, train, &mut out).unwrap());
    }

    #[test]
    fn route_turnouts_get_requested() {
        let mut layout = Layout::new();
        let a = layout.add_block(Block::new("a"));
        let b = layout.add_block(Block::new("b"));
        let c = layout.add_block(Block::new("c").with_length(80.0));
        let t = layout.add_turnout(Turnout::new("t", TurnoutCategory::SingleLeft));
        layout.link(SocketRef::block_next(a), SocketRef::turnout(t, 0)).unwrap();
        layout.link(SocketRef::turnout(t, 1), SocketRef::block_previous(b)).unwrap();
        layout.link(SocketRef::turnout(t, 2), SocketRef::block_previous(c)).unwrap();
        let train = layout.add_train(Train::new("x"));
        place(&mut layout, train, a);

        {
            use crate::layout::Scheduling;
            use crate::route::Route;
            let tr = layout.train_mut(train).unwrap();
            tr.scheduling = Scheduling::Managed { finishing: false };
            tr.route = Some(Route::fixed(vec![
                RouteItem::Block {
                    block: a,
                    direction: BlockDirection::Next,
                    wait_secs: None,
                },
                RouteItem::Turnout {
                    turnout: t,
                    from: SocketId(0),
                    to: SocketId(2),
                },
                RouteItem::Block {
                    block: c,
                    direction: BlockDirection::Next,
                    wait_secs: None,
                },
            ]));
        }

        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap();
        assert_eq!(layout.train(train).unwrap().leading.block_ids(), vec![c]);
        assert_eq!(
            out.commands,
            vec![LayoutCommand::SetTurnoutState {
                turnout: t,
                state: TurnoutState::Branch
            }]
        );
        assert_eq!(layout.turnout(t).unwrap().reservation.unwrap().to, SocketId(2));

        // Not settled until the command station confirms
        settle_turnouts(&mut layout, train, &mut out).unwrap();
        assert_eq!(layout.train(train).unwrap().leading.settled_length, 0.0);
        assert!(!is_settled(&layout, layout.train(train).unwrap(), &ReservationConfig::default()).unwrap());

        layout.turnout_mut(t).unwrap().actual_state = TurnoutState::Branch;
        assert!(settle_turnouts(&mut layout, train, &mut out).unwrap());
        assert_eq!(layout.train(train).unwrap().leading.settled_length, 80.0);
        assert!(is_settled(&layout, layout.train(train).unwrap(), &ReservationConfig::default()).unwrap());
    }

    #[test]
    fn advance_moves_block_to_trailing_and_trims() {
        let (mut layout, [a, b, c], train) = line();
        let config = ReservationConfig::default();
        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap();

        advance_to_block(&mut layout, &config, train, b, BlockDirection::Next, 1).unwrap();
        let t = layout.train(train).unwrap();
        assert_eq!(t.block, Some(b));
        assert_eq!(t.position, 1);
        assert_eq!(t.leading.block_ids(), vec![c]);
        // Unknown train length: nothing kept behind
        assert!(t.trailing.is_empty());
        assert!(layout.block(a).unwrap().reservation.is_none());
    }

    #[test]
    fn trailing_kept_for_train_length() {
        let (mut layout, [a, b, c], train) = line();
        layout.train_mut(train).unwrap().length = Some(150.0);
        let config = ReservationConfig::default();
        let mut out = Outbox::new();
        reserve_leading_blocks(&mut layout, train, 2, &mut out).unwrap();

        advance_to_block(&mut layout, &config, train, b, BlockDirection::Next, 1).unwrap();
        assert_eq!(layout.train(train).unwrap().trailing, vec![ElementId::Block(a)]);

        advance_to_block(&mut layout, &config, train, c, BlockDirection::Next, 1).unwrap();
        // b (100) alone does not cover 150, so a stays too
        assert_eq!(
            layout.train(train).unwrap().trailing,
            vec![ElementId::Block(b), ElementId::Block(a)]
        );
        assert!(layout.reservation_conflicts().is_empty());
    }

    #[test]
    fn pushed_wagons_need_train_length_ahead() {
        let mut train = Train::new("p").with_length(120.0).with_wagons_pushed(true);
        let config = ReservationConfig::default().with_stopping_distance(30.0);
        assert_eq!(required_length(&train, &config), 150.0);

        let _ = train.leading.blocks.push(LeadingBlock {
            block: BlockId(1),
            direction: BlockDirection::Next,
            turnouts: Vec::new(),
            length: 100.0,
        });
        train.leading.length = 100.0;
        assert!(!is_sufficient(&train, &config));
        train.wagons_pushed = false;
        assert!(is_sufficient(&train, &config));
    }
}
