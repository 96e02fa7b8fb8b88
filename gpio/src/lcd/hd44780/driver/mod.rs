mod pins;
mod sreg;
pub mod timing;
mod trace;

use crate::GpioResult;
use log::{debug, warn};
use std::fmt::Debug;
pub use pins::*;
pub use sreg::*;
pub use trace::*;

/// Valid bits of a DDRAM address.
pub const DDRAM_ADDRESS_MASK: u8 = 0b0111_1111;
/// Valid bits of a CGRAM address.
pub const CGRAM_ADDRESS_MASK: u8 = 0b0011_1111;
/// Valid bits of a custom character slot. The controller has room for 8 5x8 glyphs.
pub const CUSTOM_CHAR_SLOT_MASK: u8 = 0b0000_0111;

/// Distance between the DDRAM base addresses of two consecutive rows.
pub const ROW_STRIDE: u8 = 64;
/// DDRAM address of the first cell of row 0.
pub const ROW0_ADDRESS: u8 = 0x00;
/// DDRAM address of the first cell of row 1.
pub const ROW1_ADDRESS: u8 = ROW0_ADDRESS + ROW_STRIDE;

/// The `HD44780Driver` trait defines the operations of an HD44780 controller in write-only mode.
///
/// Implementations only have to provide the two raw transfers and the settle delay; every
/// controller instruction is built on top of them.
///
/// Out-of-range addresses and slots are masked into range rather than rejected, so none of the
/// provided methods fail on their own. Errors only come from the underlying GPIO backend.
pub trait HD44780Driver: Debug {
    // Low-level operations

    /// Sends an instruction byte (RS low).
    fn write_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends a data byte (RS high) to DDRAM or CGRAM, whichever was addressed last.
    fn write_data(&mut self, data: u8) -> GpioResult<()>;

    /// Blocks for [timing::COMMAND_SETTLE].
    fn settle(&mut self) -> GpioResult<()>;

    // Display operations

    /// Puts the controller in the operating mode this driver assumes: entry mode increment with
    /// no shift, display on with cursor and blink off, 8-bit bus with 2 lines and the 5x8 font.
    ///
    /// Call once, before anything else.
    fn initialize_display(&mut self) -> GpioResult<()> {
        self.settle()?;
        self.set_entry_mode(CursorDirection::Right, false)?;
        self.set_display_control(true, false, false)?;
        self.function_set(true, true, false)?;
        Ok(())
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.settle()?;
        self.write_command(0b00000001)?;
        self.return_home()
    }

    /// Moves the cursor to the given cell.
    ///
    /// The address is `row * 64 + column`, wrapped by the DDRAM mask. Nothing checks that the cell
    /// is visible.
    fn goto(&mut self, column: u8, row: u8) -> GpioResult<()> {
        self.settle()?;
        self.set_ddram_address(row.wrapping_mul(ROW_STRIDE).wrapping_add(column))
    }

    /// Writes each character of `text` at the cursor.
    ///
    /// There is no wrapping: text past the end of a row continues at the next DDRAM address,
    /// wherever the controller maps it. Characters outside ASCII are written as `?`.
    fn draw_str(&mut self, text: &str) -> GpioResult<()> {
        for c in text.chars() {
            if c.is_ascii() {
                self.write_data(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.write_data(b'?')?;
            }
        }
        Ok(())
    }

    /// Writes raw character codes at the cursor, e.g. `0..=7` for custom characters.
    fn draw_bytes(&mut self, bytes: &[u8]) -> GpioResult<()> {
        for &byte in bytes {
            self.write_data(byte)?;
        }
        Ok(())
    }

    /// Stores a glyph in CGRAM. The CGRAM address is set to the slot, then the 8 rows are written
    /// one after another, relying on the controller's auto-increment.
    ///
    /// The slot is masked to `0..=7`.
    ///
    /// This leaves the address counter in CGRAM: move the cursor before drawing text again.
    fn create_custom_char(&mut self, glyph: CustomChar) -> GpioResult<()> {
        self.set_cgram_address(glyph.slot & CUSTOM_CHAR_SLOT_MASK)?;
        for row in glyph.bitmap {
            self.write_data(row)?;
        }
        Ok(())
    }

    // Controller instructions

    /// Sets the cursor to the home position, without clearing DDRAM.
    fn return_home(&mut self) -> GpioResult<()> {
        self.write_command(0b00000010)
    }

    /// Sets how the address counter moves after each data write, and whether the display shifts
    /// along with it.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.write_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.write_command(command)
    }

    /// Moves the cursor or shifts the display.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.write_command(command)
    }

    /// Sets the bus width, the number of lines and the font.
    ///
    /// This driver only ever talks 8-bit, so `eight_bit` should stay `true`.
    fn function_set(&mut self, eight_bit: bool, two_lines: bool, large_font: bool) -> GpioResult<()> {
        let mut command = 0b00100000;
        if eight_bit {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if large_font {
            command |= 0b00000100;
        }
        self.write_command(command)
    }

    /// Sets the CGRAM address, masked to 6 bits.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        let masked = address & CGRAM_ADDRESS_MASK;
        if masked != address {
            debug!("CGRAM address {:#04x} masked to {:#04x}", address, masked);
        }
        self.write_command(0b01000000 | masked)
    }

    /// Sets the DDRAM address, masked to 7 bits.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        let masked = address & DDRAM_ADDRESS_MASK;
        if masked != address {
            debug!("DDRAM address {:#04x} masked to {:#04x}", address, masked);
        }
        self.write_command(0b10000000 | masked)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

/// A 5x8 glyph to be stored in CGRAM.
///
/// Each byte of `bitmap` is one pixel row, top to bottom; only the low 5 bits are displayed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CustomChar {
    pub slot: u8,
    pub bitmap: [u8; 8],
}

impl CustomChar {
    pub const fn new(slot: u8, bitmap: [u8; 8]) -> Self {
        CustomChar { slot, bitmap }
    }
}
