//! In-memory GPIO backend that records everything done to it.
//!
//! Used by the tests, and by the demo binary for dry runs without hardware. The recorded log keeps
//! pin-mux calls, output claims, pin writes and delays in the exact order they happened, so both
//! the levels on the lines and the time between transitions can be checked afterwards.
use crate::{Delay, GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MockEvent {
    /// A physical pin was routed to a GPIO line.
    Function { physical_pin: usize, line: usize },
    /// A line was claimed and set to output mode.
    Output { line: usize },
    /// A level was written to an output line.
    Write { line: usize, value: bool },
    /// The caller blocked for the given duration.
    Delay(Duration),
}

pub struct MockGpioDriver {
    pin_count: usize,
    used_pins: BitVec<AtomicU8>,
    events: RefCell<Vec<MockEvent>>,
}

impl MockGpioDriver {
    pub fn new(pin_count: usize) -> Self {
        Self {
            pin_count,
            used_pins: BitVec::repeat(false, pin_count),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Gets a copy of every event recorded so far.
    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }

    /// Forgets the recorded events, keeping line claims intact.
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Gets the last level written to the line, if any.
    pub fn level(&self, line: usize) -> Option<bool> {
        self.events.borrow().iter().rev().find_map(|event| match *event {
            MockEvent::Write { line: l, value } if l == line => Some(value),
            _ => None,
        })
    }

    /// Sums up every recorded delay.
    pub fn total_delay(&self) -> Duration {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MockEvent::Delay(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    fn record(&self, event: MockEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.pin_count)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.pin_count)
    }

    /// Accepts any route, the way a full crossbar would.
    fn set_pin_function(&self, physical_pin: usize, line: usize) -> GpioResult<()> {
        if physical_pin >= self.pin_count || line >= self.pin_count {
            return Err(GpioError::InvalidArgument);
        }
        self.record(MockEvent::Function { physical_pin, line });
        Ok(())
    }

    fn get_output(&self, line: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if line >= self.pin_count {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[line] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(line, true);
        self.record(MockEvent::Output { line });

        Ok(Box::new(MockOutput { driver: self, line }))
    }
}

impl Delay for MockGpioDriver {
    fn delay(&self, duration: Duration) {
        self.record(MockEvent::Delay(duration));
    }
}

struct MockOutput<'a> {
    driver: &'a MockGpioDriver,
    line: usize,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.line)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.record(MockEvent::Write { line: self.line, value });
        Ok(())
    }
}

impl Drop for MockOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.line, false);
    }
}
