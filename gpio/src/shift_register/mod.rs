//! Serial-in/parallel-out shift register (74HC164 style) driven by three GPIO lines.
use crate::{Delay, GpioOutput, GpioResult};
use log::trace;
use std::fmt::Debug;
use std::time::Duration;

/// Minimum low time of the active-low clear (master reset) input.
///
/// The register datasheets ask for far less; 10 µs leaves room for slow level shifters and long
/// wires between the host and the register.
pub const CLEAR_PULSE: Duration = Duration::from_micros(10);

/// A shift register loaded one bit per rising clock edge.
///
/// Bits are shifted in least significant first, so after a full byte the first bit loaded sits
/// furthest from the serial input. Whether that order matches whatever is wired to the parallel
/// outputs is up to the caller (see [mirror_byte](crate::lcd::hd44780::driver::mirror_byte)).
#[derive(Debug)]
pub struct ShiftRegister<'a> {
    clk: Box<dyn GpioOutput + 'a>,
    clr: Box<dyn GpioOutput + 'a>,
    dat: Box<dyn GpioOutput + 'a>,
    delay: &'a dyn Delay,
}

impl<'a> ShiftRegister<'a> {
    /// Creates a shift register from already configured output lines.
    ///
    /// The lines are expected to idle with clear and clock high, which keeps the register enabled
    /// and makes the first low-to-high clock transition a real edge.
    pub fn new(
        clk: Box<dyn GpioOutput + 'a>,
        clr: Box<dyn GpioOutput + 'a>,
        dat: Box<dyn GpioOutput + 'a>,
        delay: &'a dyn Delay,
    ) -> Self {
        ShiftRegister { clk, clr, dat, delay }
    }

    /// Resets every stage of the register to zero.
    pub fn clear(&self) -> GpioResult<()> {
        self.clr.write(false)?;
        self.delay.delay(CLEAR_PULSE);
        self.clr.write(true)?;
        Ok(())
    }

    /// Clears the register, then loads `byte` into it, LSb first.
    pub fn transmit(&self, byte: u8) -> GpioResult<()> {
        trace!("Shifting out: {:08b}", byte);

        self.clear()?;
        for bit in 0..8 {
            self.clk.write(false)?;
            self.dat.write(byte & (1 << bit) != 0)?;
            // Rising edge latches the data bit
            self.clk.write(true)?;
        }
        Ok(())
    }
}
