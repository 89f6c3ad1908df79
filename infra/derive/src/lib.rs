#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the heartbeat workspace: a runtime bootstrap for
//! `async fn main` and the error-enum attribute every library crate uses.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Bootstraps a pre-configured Tokio runtime around an `async fn main`.
///
/// # Arguments
///
/// * `default` - Worker threads detected from the host.
/// * `memory_efficient` - Half the workers and smaller stacks; the profile used on the Pi.
/// * `high_performance` - Larger stacks and longer keep-alive.
///
/// # Examples
///
/// ```rust,ignore
/// #[hb_runtime::main(memory_efficient)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Turns an enum into a workspace error type.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `<ErrorName>Ext` with `.context(..)` for `Result<T, ErrorName>` and for
///   `Result<T, Source>` of every variant that wraps a `source`.
/// * `From<Source>` for each such variant.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
///
/// # Requirements
///
/// Variants use named fields. A variant with a `source` must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[hb_derive::hb_error]
/// pub enum CaptureError {
///     #[error("I/O error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn hb_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
