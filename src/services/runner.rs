//! Tokio service owning a layout controller.
//!
//! # Example
//!
//! ```ignore
//! use rs_trainz_layout::services::LayoutService;
//!
//! let service = LayoutService::start(controller);
//! let mut events = service.subscribe();
//!
//! service.send(InputEvent::FeedbackTriggered { feedback, detected: true }).await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::controller::LayoutController;
use crate::events::{InputEvent, LayoutEvent};
use crate::traits::LayoutInterface;

/// Default capacity of the input channel.
pub const INPUT_CAPACITY: usize = 64;

/// Default capacity of the event broadcast channel.
pub const EVENT_CAPACITY: usize = 256;

type Shared<I> = Arc<Mutex<LayoutController<I>>>;

/// A layout controller running on the tokio runtime.
pub struct LayoutService<I: LayoutInterface> {
    controller: Shared<I>,
    inputs: mpsc::Sender<InputEvent>,
    events: broadcast::Sender<LayoutEvent>,
    task: JoinHandle<()>,
}

impl<I> LayoutService<I>
where
    I: LayoutInterface + Send + 'static,
{
    /// Start the service with default channel capacities.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(controller: LayoutController<I>) -> Self {
        Self::with_capacity(controller, INPUT_CAPACITY, EVENT_CAPACITY)
    }

    /// Start the service with explicit channel capacities.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_capacity(
        mut controller: LayoutController<I>,
        input_capacity: usize,
        event_capacity: usize,
    ) -> Self {
        let (inputs, mut receiver) = mpsc::channel(input_capacity);
        let (events, _) = broadcast::channel(event_capacity);
        let runtime = tokio::runtime::Handle::current();

        let timer_inputs = inputs.clone();
        let publisher = events.clone();
        controller.subscribe(move |event| {
            if let LayoutEvent::RestartTimerRequested { train, delay_secs } = *event {
                let tx = timer_inputs.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(Duration::from_secs(u64::from(delay_secs))).await;
                    log::debug!("{train}: restart timer fired");
                    // A closed channel means the service is gone
                    let _ = tx.send(InputEvent::RestartTimerFired { train }).await;
                });
            }
            // No receivers is fine
            let _ = publisher.send(event.clone());
        });

        let controller = Arc::new(Mutex::new(controller));
        let worker = Arc::clone(&controller);
        let task = tokio::spawn(async move {
            while let Some(input) = receiver.recv().await {
                let mut guard = worker.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(err) = guard.handle(input) {
                    log::error!("{input:?}: {err}");
                }
            }
            log::info!("layout service stopped");
        });

        Self {
            controller,
            inputs,
            events,
            task,
        }
    }

    /// Queue an input event.
    pub async fn send(&self, input: InputEvent) -> Result<(), mpsc::error::SendError<InputEvent>> {
        self.inputs.send(input).await
    }

    /// A sender for input events, e.g. for a hardware polling task.
    pub fn sender(&self) -> mpsc::Sender<InputEvent> {
        self.inputs.clone()
    }

    /// Receive every layout event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LayoutEvent> {
        self.events.subscribe()
    }

    /// Access the controller with the lock held.
    ///
    /// The closure pattern keeps the lock from being held across await
    /// points.
    pub fn with_controller<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut LayoutController<I>) -> R,
    {
        let mut guard = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Stop processing inputs. Pending timers are dropped with the runtime.
    pub fn shutdown(self) {
        self.task.abort();
    }
}
