use hb_derive::hb_error;
use std::borrow::Cow;

#[hb_error]
pub enum PortError {
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<(), PortError> {
    Err(std::io::Error::other("no device")).context("Opening /dev/ttyUSB0")
}

fn main() {
    let err = open().unwrap_err();
    assert!(err.to_string().contains("/dev/ttyUSB0"));

    let internal: PortError = "bad state".into();
    assert!(matches!(internal, PortError::Internal { .. }));
}
