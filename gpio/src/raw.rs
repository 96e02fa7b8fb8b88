//! Register-level GPIO driver for the BCM283x family (Raspberry Pi), mapping the GPIO block
//! through `/dev/gpiomem` or `/dev/mem`.
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    // #[cfg(target_pointer_width = "64")]
    // const GPIO_BASE: u32 = 0xFE200000;
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    const FUNCTION_INPUT: u32 = 0b000;
    const FUNCTION_OUTPUT: u32 = 0b001;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
                .offset(offset)
                .len(4096)
                .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which needs no root privileges.
    pub fn new_gpiomem() -> GpioResult<Self> {
        // gpiomem exposes the GPIO block itself at offset 0
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block through `/dev/mem`.
    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE as u64)
    }

    fn raw_set_pin_function(&self, pin_index: usize, function: u32) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= function << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        trace!("Set pin function: pin_index={} function={:03b}", pin_index, function);

        Ok(())
    }

    fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr = unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    /// The BCM283x has no crossbar: pin `n` is always line `n`. Routing resets the pin to the plain
    /// GPIO (input) function, away from any alternate function it might have been left in.
    fn set_pin_function(&self, physical_pin: usize, line: usize) -> GpioResult<()> {
        if physical_pin != line || line >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[line] {
            return Err(GpioError::AlreadyInUse);
        }

        self.raw_set_pin_function(line, Self::FUNCTION_INPUT)
    }

    fn get_output(&self, line: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if line >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[line] {
            return Err(GpioError::AlreadyInUse);
        }

        self.raw_set_pin_function(line, Self::FUNCTION_OUTPUT)?;
        self.used_pins.set_aliased(line, true);

        Ok(Box::new(RawGpioOutput {
            driver: self,
            pin_index: line,
        }))
    }
}

struct RawGpioOutput<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.pin_index)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.raw_set_pin_output(self.pin_index, value)
    }
}

impl Drop for RawGpioOutput<'_> {
    fn drop(&mut self) {
        _ = self.driver.raw_set_pin_function(self.pin_index, RawGpioDriver::FUNCTION_INPUT);
        self.driver.used_pins.set_aliased(self.pin_index, false);
    }
}
