//! HD44780 LCD module.
//!
//! The controller is driven write-only, in 8-bit mode, with the data byte supplied by a
//! [shift register](crate::shift_register) instead of eight GPIO lines. See
//! [ShiftRegisterHD44780Driver](driver::ShiftRegisterHD44780Driver) for the wiring and
//! [HD44780Driver](driver::HD44780Driver) for the operations.
pub mod driver;
