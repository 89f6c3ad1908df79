//! Pieces every node binary needs: layered config loading, capture ids and the
//! `/health` route.
//!
//! ```rust,no_run
//! use hb_kernel::config::load_config;
//! use hb_kernel::domain::config::NodeConfig;
//!
//! let cfg: NodeConfig = load_config(Some("config.toml")).unwrap_or_default();
//! let capture_id = hb_kernel::capture_id();
//! assert_eq!(capture_id.len(), hb_kernel::domain::constants::CAPTURE_ID_LEN);
//! ```
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub use hb_domain as domain;

use hb_domain::constants::CAPTURE_ID_LEN;

/// Characters a capture id may contain. Digits `0`/`1` and letters `I`, `O`, `l`
/// are left out so ids read back correctly off a screen or a paper log.
pub const ID_ALPHABET: [char; 55] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Random id of `len` characters drawn from [`ID_ALPHABET`].
#[must_use]
pub fn readable_id(len: usize) -> String {
    nanoid::nanoid!(len, &ID_ALPHABET)
}

/// Fresh id for one acquisition run, shared by every file it rotates through.
#[must_use]
pub fn capture_id() -> String {
    readable_id(CAPTURE_ID_LEN)
}
