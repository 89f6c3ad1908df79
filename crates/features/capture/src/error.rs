use std::borrow::Cow;

/// Errors raised while writing or reading capture files.
#[hb_derive::hb_error]
pub enum CaptureError {
    #[error("Capture I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// The metadata header is malformed or incomplete.
    #[error("Capture metadata error{}: {message}", format_context(.context))]
    Metadata { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Capture config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal capture error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
