//! Shared layouts for the integration tests

#![allow(dead_code)]

use rs_trainz_layout::hal::MockInterface;
use rs_trainz_layout::layout::{
    Block, BlockCategory, BlockId, Feedback, FeedbackId, Layout, SocketRef, Train, TrainId,
    Turnout, TurnoutCategory, TurnoutId,
};
use rs_trainz_layout::{Config, LayoutController};

/// Route log output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn controller(layout: Layout, config: Config) -> LayoutController<MockInterface> {
    init_logging();
    LayoutController::with_config(layout, config, MockInterface::new())
}

// ============================================================================
// Diamond
// ============================================================================

/// Two ways from `s0` to `s1`:
///
/// ```text
///            +-- b1 (300) -----------------+
/// s0 -- tA --+                             +-- tB -- s1
///            +-- b2 (200) -- b3 (300) -----+
/// ```
///
/// Turnouts and `s1` have no length.
pub struct Diamond {
    pub layout: Layout,
    pub s0: BlockId,
    pub b1: BlockId,
    pub b2: BlockId,
    pub b3: BlockId,
    pub s1: BlockId,
    pub ta: TurnoutId,
    pub tb: TurnoutId,
    pub train: TrainId,
}

pub fn diamond() -> Diamond {
    let mut layout = Layout::new();
    let s0 = layout.add_block(Block::new("s0").with_length(100.0));
    let b1 = layout.add_block(Block::new("b1").with_length(300.0));
    let b2 = layout.add_block(Block::new("b2").with_length(200.0));
    let b3 = layout.add_block(Block::new("b3").with_length(300.0));
    let s1 = layout.add_block(Block::new("s1"));
    let ta = layout.add_turnout(Turnout::new("tA", TurnoutCategory::SingleLeft));
    let tb = layout.add_turnout(Turnout::new("tB", TurnoutCategory::SingleRight));

    let links = [
        (SocketRef::block_next(s0), SocketRef::turnout(ta, 0)),
        (SocketRef::turnout(ta, 1), SocketRef::block_previous(b1)),
        (SocketRef::turnout(ta, 2), SocketRef::block_previous(b2)),
        (SocketRef::block_next(b1), SocketRef::turnout(tb, 1)),
        (SocketRef::block_next(b2), SocketRef::block_previous(b3)),
        (SocketRef::block_next(b3), SocketRef::turnout(tb, 2)),
        (SocketRef::turnout(tb, 0), SocketRef::block_previous(s1)),
    ];
    for (a, b) in links {
        layout.link(a, b).unwrap();
    }
    let train = layout.add_train(Train::new("ice"));

    Diamond {
        layout,
        s0,
        b1,
        b2,
        b3,
        s1,
        ta,
        tb,
        train,
    }
}

// ============================================================================
// Loop
// ============================================================================

/// A closed loop with a siding off `t1`:
///
/// ```text
///   s1[f11,f12] -- t1 -- s2[f21,f22] -- b3[f3] --+
///    ^             |                             |
///    |             +-- yard (sidetrack)          |
///    +-------------------------------------------+
/// ```
pub struct Loop {
    pub layout: Layout,
    pub s1: BlockId,
    pub s2: BlockId,
    pub b3: BlockId,
    pub yard: BlockId,
    pub t1: TurnoutId,
    pub f11: FeedbackId,
    pub f12: FeedbackId,
    pub f21: FeedbackId,
    pub f22: FeedbackId,
    pub f3: FeedbackId,
    pub train: TrainId,
}

pub fn loop_layout() -> Loop {
    let mut layout = Layout::new();
    let f11 = layout.add_feedback(Feedback::new("f11"));
    let f12 = layout.add_feedback(Feedback::new("f12"));
    let f21 = layout.add_feedback(Feedback::new("f21"));
    let f22 = layout.add_feedback(Feedback::new("f22"));
    let f3 = layout.add_feedback(Feedback::new("f3"));

    let s1 = layout.add_block(Block::new("s1").with_feedbacks(&[f11, f12]));
    let s2 = layout.add_block(Block::new("s2").with_feedbacks(&[f21, f22]));
    let b3 = layout.add_block(Block::new("b3").with_feedbacks(&[f3]));
    let yard = layout.add_block(Block::new("yard").with_category(BlockCategory::Sidetrack));
    let t1 = layout.add_turnout(Turnout::new("t1", TurnoutCategory::SingleLeft));

    let links = [
        (SocketRef::block_next(s1), SocketRef::turnout(t1, 0)),
        (SocketRef::turnout(t1, 1), SocketRef::block_previous(s2)),
        (SocketRef::turnout(t1, 2), SocketRef::block_previous(yard)),
        (SocketRef::block_next(s2), SocketRef::block_previous(b3)),
        (SocketRef::block_next(b3), SocketRef::block_previous(s1)),
    ];
    for (a, b) in links {
        layout.link(a, b).unwrap();
    }
    let train = layout.add_train(Train::new("loco"));

    Loop {
        layout,
        s1,
        s2,
        b3,
        yard,
        t1,
        f11,
        f12,
        f21,
        f22,
        f3,
        train,
    }
}

// ============================================================================
// Line with a station
// ============================================================================

/// `a[f0] -> s[f1] (station) -> c[f2]`
pub struct StationLine {
    pub layout: Layout,
    pub a: BlockId,
    pub s: BlockId,
    pub c: BlockId,
    pub f0: FeedbackId,
    pub f1: FeedbackId,
    pub f2: FeedbackId,
    pub train: TrainId,
}

pub fn station_line() -> StationLine {
    let mut layout = Layout::new();
    let f0 = layout.add_feedback(Feedback::new("f0"));
    let f1 = layout.add_feedback(Feedback::new("f1"));
    let f2 = layout.add_feedback(Feedback::new("f2"));
    let a = layout.add_block(Block::new("a").with_feedbacks(&[f0]));
    let s = layout.add_block(
        Block::new("s")
            .with_category(BlockCategory::Station)
            .with_feedbacks(&[f1]),
    );
    let c = layout.add_block(Block::new("c").with_feedbacks(&[f2]));
    layout
        .link(SocketRef::block_next(a), SocketRef::block_previous(s))
        .unwrap();
    layout
        .link(SocketRef::block_next(s), SocketRef::block_previous(c))
        .unwrap();
    let train = layout.add_train(Train::new("regio"));

    StationLine {
        layout,
        a,
        s,
        c,
        f0,
        f1,
        f2,
        train,
    }
}
