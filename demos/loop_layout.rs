//! Loop layout demo with a simulated command station.
//!
//! One train runs two laps around a three-block loop. Feedback sensors are
//! fired in the order the train would pass them, and every layout event and
//! command is printed as it happens.
//!
//! ```text
//!   s1[f11,f12] -- t1 -- s2[f21,f22] -- b3[f3] --+
//!    ^             |                             |
//!    |             +-- yard                      |
//!    +-------------------------------------------+
//! ```
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=debug cargo run --example loop_layout
//! ```

use anyhow::{Context, Result};
use rs_trainz_layout::hal::MockInterface;
use rs_trainz_layout::layout::{
    Block, BlockCategory, Feedback, Layout, SocketRef, Train, Turnout, TurnoutCategory,
};
use rs_trainz_layout::{BlockDirection, Config, InputEvent, LayoutController, ReservationConfig};

fn build_layout() -> Result<Layout> {
    let mut layout = Layout::new();
    let f11 = layout.add_feedback(Feedback::new("f11"));
    let f12 = layout.add_feedback(Feedback::new("f12"));
    let f21 = layout.add_feedback(Feedback::new("f21"));
    let f22 = layout.add_feedback(Feedback::new("f22"));
    let f3 = layout.add_feedback(Feedback::new("f3"));

    let s1 = layout.add_block(
        Block::new("s1")
            .with_length(120.0)
            .with_feedbacks(&[f11, f12]),
    );
    let s2 = layout.add_block(
        Block::new("s2")
            .with_length(120.0)
            .with_feedbacks(&[f21, f22]),
    );
    let b3 = layout.add_block(Block::new("b3").with_length(200.0).with_feedbacks(&[f3]));
    let yard = layout.add_block(
        Block::new("yard")
            .with_length(80.0)
            .with_category(BlockCategory::Sidetrack),
    );
    let t1 = layout.add_turnout(Turnout::new("t1", TurnoutCategory::SingleLeft).with_length(20.0));

    layout.link(SocketRef::block_next(s1), SocketRef::turnout(t1, 0))?;
    layout.link(SocketRef::turnout(t1, 1), SocketRef::block_previous(s2))?;
    layout.link(SocketRef::turnout(t1, 2), SocketRef::block_previous(yard))?;
    layout.link(SocketRef::block_next(s2), SocketRef::block_previous(b3))?;
    layout.link(SocketRef::block_next(b3), SocketRef::block_previous(s1))?;

    layout.add_train(Train::new("BR 218").with_length(60.0).with_max_speed(100));
    Ok(layout)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================");
    println!("  rs-trainz-layout loop demo");
    println!("=================================");
    println!();

    let layout = build_layout().context("building the loop")?;
    let s1 = layout.find_block("s1").context("s1 missing")?;
    let train = *layout.train_ids().first().context("no train")?;
    let laps: Vec<_> = ["f11", "f12", "f21", "f22", "f3"]
        .iter()
        .map(|name| layout.find_feedback(name).context("feedback missing"))
        .collect::<Result<_>>()?;

    let config = Config::default()
        .with_name("demo loop")
        .with_reservation(ReservationConfig::default().with_max_leading_blocks(1));
    let mut controller = LayoutController::with_config(layout, config, MockInterface::new());
    controller.subscribe(|event| println!("  event: {event:?}"));

    controller.place_train(train, s1, BlockDirection::Next)?;
    controller.set_requested_speed(train, 60)?;

    for lap in 1..=2 {
        println!();
        println!("--- lap {lap} ---");
        for &feedback in &laps {
            println!("> {feedback} detected");
            controller.handle(InputEvent::FeedbackTriggered {
                feedback,
                detected: true,
            })?;
            controller.handle(InputEvent::FeedbackTriggered {
                feedback,
                detected: false,
            })?;
        }
        let status = controller.train_status(train)?;
        println!(
            "  {} in {:?} at {}, {} km/h, leading {:?}",
            status.name, status.block, status.position, status.commanded_kph, status.leading
        );
    }

    println!();
    println!("--- stopping ---");
    controller.stop(train)?;
    println!("  commands sent: {}", controller.interface().commands().len());
    for command in controller.interface_mut().take_commands() {
        println!("  {command:?}");
    }

    Ok(())
}
