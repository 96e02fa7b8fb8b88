//! GpiodDriver implementation for driving GPIO lines through the Linux GPIO character device,
//! using the gpiod library.
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO lines.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            chip,
            used_pins: bits,
        }
    }

    /// Opens the GPIO chip device, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path.as_ref())?))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    /// The kernel owns pin muxing, so only the identity route is accepted.
    fn set_pin_function(&self, physical_pin: usize, line: usize) -> GpioResult<()> {
        if physical_pin != line || line >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    fn get_output(&self, line: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if line >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[line] {
            return Err(GpioError::AlreadyInUse);
        }

        let lines = self.chip.request_lines(
            gpiod::Options::output([line as u32]).consumer(env!("CARGO_PKG_NAME")),
        )?;

        self.used_pins.set_aliased(line, true);

        Ok(Box::new(GpiodOutput {
            driver: self,
            pin_index: line,
            lines,
        }))
    }
}

struct GpiodOutput<'a> {
    driver: &'a GpiodDriver,
    pin_index: usize,
    lines: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.lines.set_values([value])?;
        Ok(())
    }
}

impl Drop for GpiodOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}
