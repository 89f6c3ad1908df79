use std::borrow::Cow;

#[hb_derive::hb_error]
pub enum TelemetryError {
    #[error("Metrics encoding error{}: {source}", format_context(.context))]
    Encode { source: std::fmt::Error, context: Option<Cow<'static, str>> },

    #[cfg(all(feature = "gpio", target_os = "linux"))]
    #[error("GPIO error{}: {source}", format_context(.context))]
    Gpio { source: rppal::gpio::Error, context: Option<Cow<'static, str>> },

    #[error("Internal telemetry error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
