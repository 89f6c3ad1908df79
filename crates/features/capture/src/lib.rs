//! Capture feature: turns the acquisition MCU's serial lines into [`Frame`]s and
//! persists the raw lines into rotating, self-describing CSV files.
//!
//! ```rust
//! use hb_capture::Frame;
//!
//! let frame: Frame = "$1712000000,G,20000,52.1,4.3,12.0,7,0.0,0.0,3,500,512,524,1536".parse()?;
//! assert!(frame.has_gps_fix());
//! assert_eq!(frame.samples(), &[500, 512, 524]);
//! # Ok::<(), hb_capture::FrameError>(())
//! ```

mod error;
pub mod frame;
pub mod metadata;
pub mod writer;

pub use error::{CaptureError, CaptureErrorExt};
pub use frame::{Frame, FrameError, FrameFlags};
pub use metadata::CaptureMetadata;
pub use writer::{CaptureWriter, RotatingCapture, epoch_seconds};
