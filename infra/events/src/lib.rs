//! # Event Bus
//!
//! A small, type-keyed event bus. Each Rust type gets at most one channel,
//! either **broadcast** (every subscriber sees every event, slow ones skip
//! ahead) or **watch** (subscribers only ever see the latest value).
//!
//! The acquisition loop publishes every stored frame on a broadcast channel and
//! the status LED color on a watch channel. The frame monitor and the LED log
//! follow them without knowing about the loop.
//!
//! # Example
//!
//! ```rust
//! use hb_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct FrameReceived { index: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let mut rx = bus.subscribe::<FrameReceived>()?;
//!     bus.publish(FrameReceived { index: 7 })?;
//!     let event = EventReceiverExt::recv(&mut rx).await;
//!     assert_eq!(event.map(|e| e.index), Some(7));
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
