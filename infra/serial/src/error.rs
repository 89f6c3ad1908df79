use std::borrow::Cow;

#[hb_derive::hb_error]
pub enum SerialError {
    /// The port could not be opened or configured.
    #[error("Serial port error{}: {source}", format_context(.context))]
    Port { source: serialport::Error, context: Option<Cow<'static, str>> },

    #[error("Serial I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// The device went away (unplugged, broken pipe, end of stream).
    #[error("Serial device disconnected{}: {message}", format_context(.context))]
    Disconnected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
