use crate::error::TelemetryError;
use serde::Serialize;
use std::fmt;

/// Colors the common-cathode RGB LED can show with on/off pins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
    White,
    #[default]
    Off,
}

impl LedColor {
    /// Pin levels as `(red, green, blue)`.
    #[must_use]
    pub const fn levels(self) -> (bool, bool, bool) {
        match self {
            Self::Red => (true, false, false),
            Self::Green => (false, true, false),
            Self::Blue => (false, false, true),
            Self::Cyan => (false, true, true),
            Self::Magenta => (true, false, true),
            Self::Yellow => (true, true, false),
            Self::White => (true, true, true),
            Self::Off => (false, false, false),
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Anything that can display a [`LedColor`].
pub trait StatusLed: Send + fmt::Debug + 'static {
    /// # Errors
    /// Returns an error if the hardware rejects the change.
    fn set(&mut self, color: LedColor) -> Result<(), TelemetryError>;
}

impl StatusLed for Box<dyn StatusLed> {
    fn set(&mut self, color: LedColor) -> Result<(), TelemetryError> {
        (**self).set(color)
    }
}

/// For hosts without an LED; accepts every color.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLed;

impl StatusLed for NoopLed {
    fn set(&mut self, _color: LedColor) -> Result<(), TelemetryError> {
        Ok(())
    }
}

#[cfg(all(feature = "gpio", target_os = "linux"))]
mod gpio {
    use super::{LedColor, StatusLed};
    use crate::error::{TelemetryError, TelemetryErrorExt};
    use rppal::gpio::{Gpio, OutputPin};

    /// RGB LED wired to three BCM GPIO pins.
    #[derive(Debug)]
    pub struct GpioLed {
        red: OutputPin,
        green: OutputPin,
        blue: OutputPin,
    }

    impl GpioLed {
        /// Claims the three pins as outputs and switches the LED off.
        ///
        /// # Errors
        /// Returns [`TelemetryError::Gpio`] if the GPIO peripheral or a pin is unavailable.
        pub fn new(pin_red: u8, pin_green: u8, pin_blue: u8) -> Result<Self, TelemetryError> {
            let gpio = Gpio::new().context("Failed to access GPIO")?;
            let mut led = Self {
                red: gpio.get(pin_red).context(format!("GPIO pin {pin_red}"))?.into_output(),
                green: gpio.get(pin_green).context(format!("GPIO pin {pin_green}"))?.into_output(),
                blue: gpio.get(pin_blue).context(format!("GPIO pin {pin_blue}"))?.into_output(),
            };
            led.set(LedColor::Off)?;
            Ok(led)
        }
    }

    impl StatusLed for GpioLed {
        fn set(&mut self, color: LedColor) -> Result<(), TelemetryError> {
            let (red, green, blue) = color.levels();
            self.red.write(red.into());
            self.green.write(green.into());
            self.blue.write(blue.into());
            Ok(())
        }
    }
}

#[cfg(all(feature = "gpio", target_os = "linux"))]
pub use gpio::GpioLed;
