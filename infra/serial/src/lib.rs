//! # Serial
//!
//! The acquisition MCU writes newline-terminated ASCII over a UART. Reads are
//! blocking, so [`spawn_reader`] runs a [`LineSource`] on tokio's blocking pool
//! and forwards [`SerialEvent`]s over an mpsc channel.
//!
//! ```rust
//! use hb_serial::{ReaderSource, SerialEvent, spawn_reader};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let source = ReaderSource::new(&b"$1,G\n"[..]);
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(8);
//!     spawn_reader(source, tx, CancellationToken::new());
//!
//!     assert_eq!(rx.recv().await, Some(SerialEvent::Line("$1,G\n".to_owned())));
//!     assert!(matches!(rx.recv().await, Some(SerialEvent::Disconnected(_))));
//! }
//! ```

mod error;
mod reader;
mod source;

pub use error::{SerialError, SerialErrorExt};
pub use reader::{MAX_CONSECUTIVE_ERRORS, SerialEvent, spawn_reader};
pub use source::{LineSource, ReaderSource, SerialPortSource, available_ports};
