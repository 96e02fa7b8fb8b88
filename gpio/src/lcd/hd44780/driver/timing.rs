//! Bus timing of the HD44780 controller.
//!
//! These are requirements of the controller, not tuning knobs. They are rounded up from the
//! datasheet minimums; none of them may be shortened.
use std::time::Duration;

/// Time EN is held low before the rising edge, so RS/RW and the data lines are stable when the
/// controller starts sampling.
pub const ENABLE_SETUP: Duration = Duration::from_micros(1);

/// Width of the EN high phase. The data must stay valid for the whole pulse.
pub const ENABLE_PULSE_WIDTH: Duration = Duration::from_micros(80);

/// Wait after the EN falling edge. Covers the data hold time and the execution time of every
/// instruction except clear display and return home.
pub const ENABLE_HOLD: Duration = Duration::from_micros(100);

/// Settle time before cursor moves, clears and initialization. Clear display and return home take
/// up to 1.52 ms to execute, and there is no busy flag to poll in write-only mode.
pub const COMMAND_SETTLE: Duration = Duration::from_millis(2);
