//! # Domain Models
//!
//! Pure types shared by the acquisition node and the release tooling.
//! Keep it lean: no I/O, networking, or heavy logic, just data and constants.

pub mod config;
pub mod constants;
