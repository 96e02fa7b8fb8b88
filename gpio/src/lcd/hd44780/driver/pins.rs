/// Physical pins the shift register and the LCD control lines are wired to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Lcd1602Pins {
    /// Shift register clock.
    pub sreg_clk: usize,
    /// Shift register clear (active low).
    pub sreg_clr: usize,
    /// Shift register serial data.
    pub sreg_dat: usize,
    /// LCD enable.
    pub lcd_en: usize,
    /// LCD register select.
    pub lcd_rs: usize,
    /// LCD read/write.
    pub lcd_rw: usize,
}

impl Lcd1602Pins {
    /// Gets the pins in role order: clock, clear, data, enable, register select, read/write.
    pub fn roles(&self) -> [usize; 6] {
        [self.sreg_clk, self.sreg_clr, self.sreg_dat, self.lcd_en, self.lcd_rs, self.lcd_rw]
    }
}

/// GPIO lines the physical pins get routed to.
///
/// Same shape as [Lcd1602Pins], but these are the indices handed to
/// [GpioDriver::get_output](crate::GpioDriver::get_output).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LogicalPins {
    pub sreg_clk: usize,
    pub sreg_clr: usize,
    pub sreg_dat: usize,
    pub lcd_en: usize,
    pub lcd_rs: usize,
    pub lcd_rw: usize,
}

impl LogicalPins {
    /// Gets the lines in role order: clock, clear, data, enable, register select, read/write.
    pub fn roles(&self) -> [usize; 6] {
        [self.sreg_clk, self.sreg_clr, self.sreg_dat, self.lcd_en, self.lcd_rs, self.lcd_rw]
    }

    /// Uses each physical pin as its own line, for controllers without a pin crossbar.
    pub fn identity(pins: &Lcd1602Pins) -> Self {
        LogicalPins {
            sreg_clk: pins.sreg_clk,
            sreg_clr: pins.sreg_clr,
            sreg_dat: pins.sreg_dat,
            lcd_en: pins.lcd_en,
            lcd_rs: pins.lcd_rs,
            lcd_rw: pins.lcd_rw,
        }
    }
}

impl Default for LogicalPins {
    /// Lines 10 to 15, in role order.
    fn default() -> Self {
        LogicalPins {
            sreg_clk: 10,
            sreg_clr: 11,
            sreg_dat: 12,
            lcd_en: 13,
            lcd_rs: 14,
            lcd_rw: 15,
        }
    }
}

/// Everything [ShiftRegisterHD44780Driver::setup](super::ShiftRegisterHD44780Driver::setup) needs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Lcd1602Config {
    pub pins: Lcd1602Pins,
    pub logical: LogicalPins,
    /// Whether bytes are passed through [mirror_byte](super::mirror_byte) before being shifted
    /// out, for boards where the register outputs are not wired to D0..D7 in order.
    pub input_mirrored: bool,
}

impl Lcd1602Config {
    pub const DEFAULT_INPUT_MIRRORED: bool = true;

    /// Creates a config with the default lines and mirroring enabled.
    pub fn new(pins: Lcd1602Pins) -> Self {
        Lcd1602Config {
            pins,
            logical: LogicalPins::default(),
            input_mirrored: Self::DEFAULT_INPUT_MIRRORED,
        }
    }

    pub fn with_logical_pins(mut self, logical: LogicalPins) -> Self {
        self.logical = logical;
        self
    }

    pub fn with_input_mirrored(mut self, input_mirrored: bool) -> Self {
        self.input_mirrored = input_mirrored;
        self
    }
}
