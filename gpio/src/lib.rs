pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod mock;
pub mod raw;
pub mod shift_register;

use std::fmt::Debug;
use thiserror::Error;

pub use delay::{Delay, ThreadDelay};

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A GPIO controller, split into the two capabilities the drivers in this crate need: the pin
/// multiplexer and the logical GPIO lines.
///
/// Some SoCs route any physical pad to any GPIO line through a crossbar, so a *physical pin* and a
/// *line* are separate identifiers. On controllers without a crossbar they are the same number.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Routes the physical pin to the given GPIO line.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if either index is out of range, or the backend cannot route
    ///   this pin to this line.
    fn set_pin_function(&self, physical_pin: usize, line: usize) -> GpioResult<()>;

    /// Claims the GPIO line and sets its drive mode to output.
    ///
    /// The line stays claimed until the returned output is dropped.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the line index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    fn get_output(&self, line: usize) -> GpioResult<Box<dyn GpioOutput + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO line. `true` drives it high.
    fn write(&self, value: bool) -> GpioResult<()>;
}
