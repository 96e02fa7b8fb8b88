use crate::lcd::hd44780::driver::timing::{COMMAND_SETTLE, ENABLE_HOLD, ENABLE_PULSE_WIDTH, ENABLE_SETUP};
use crate::lcd::hd44780::driver::{HD44780Driver, Lcd1602Config, Lcd1602Pins, LogicalPins};
use crate::shift_register::ShiftRegister;
use crate::{Delay, GpioDriver, GpioOutput, GpioResult};
use log::{debug, trace};

const RS_COMMAND: bool = false;
const RS_DATA: bool = true;
const RW_WRITE: bool = false;

/// Remaps a byte from the order the LCD expects to the order the shift register outputs are
/// wired in: bit 0 and bit 7 swap, as do 1 and 5, 2 and 4, 3 and 6.
///
/// Applying it twice gives back the original byte.
pub const fn mirror_byte(byte: u8) -> u8 {
    const PAIRS: [(u8, u8); 4] = [(0, 7), (1, 5), (2, 4), (3, 6)];

    let mut mirrored = 0;
    let mut i = 0;
    while i < PAIRS.len() {
        let (a, b) = PAIRS[i];
        mirrored |= ((byte >> a) & 1) << b;
        mirrored |= ((byte >> b) & 1) << a;
        i += 1;
    }
    mirrored
}

/// HD44780 driver for an LCD whose 8-bit data bus is fed by a serial-in/parallel-out shift
/// register, so only six GPIO lines are needed:
///
/// - shift register clock, clear and data,
/// - LCD enable, register select and read/write.
///
/// Each transfer sets RS and RW, loads the byte into the register, then pulses E with the timing
/// in [timing](super::timing). The controller is never read from, so RW is always low and the busy
/// flag is replaced by fixed waits.
///
/// All operations block until the transfer is done. The driver holds the six lines exclusively.
#[derive(Debug)]
pub struct ShiftRegisterHD44780Driver<'a> {
    pins: Lcd1602Pins,
    logical: LogicalPins,
    register: ShiftRegister<'a>,
    pin_e: Box<dyn GpioOutput + 'a>,
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_rw: Box<dyn GpioOutput + 'a>,
    delay: &'a dyn Delay,
    buffer: u8,
    input_mirrored: bool,
}

impl<'a> ShiftRegisterHD44780Driver<'a> {
    /// Configures the six lines and returns the driver.
    ///
    /// Every physical pin is routed to its line, every line is claimed as an output, and then all
    /// of them are driven to idle: register clear and clock high, everything else low.
    ///
    /// This does not touch the controller; call [HD44780Driver::initialize_display] next.
    pub fn setup(
        gpio: &'a dyn GpioDriver,
        delay: &'a dyn Delay,
        config: Lcd1602Config,
    ) -> GpioResult<Self> {
        let Lcd1602Config { pins, logical, input_mirrored } = config;

        debug!("Routing LCD pins {:?} to lines {:?}", pins.roles(), logical.roles());
        for (physical_pin, line) in pins.roles().into_iter().zip(logical.roles()) {
            gpio.set_pin_function(physical_pin, line)?;
        }

        let sreg_clk = gpio.get_output(logical.sreg_clk)?;
        let sreg_clr = gpio.get_output(logical.sreg_clr)?;
        let sreg_dat = gpio.get_output(logical.sreg_dat)?;
        let pin_e = gpio.get_output(logical.lcd_en)?;
        let pin_rs = gpio.get_output(logical.lcd_rs)?;
        let pin_rw = gpio.get_output(logical.lcd_rw)?;

        sreg_clr.write(true)?;
        sreg_clk.write(true)?;
        sreg_dat.write(false)?;
        pin_e.write(false)?;
        pin_rs.write(false)?;
        pin_rw.write(false)?;

        debug!("LCD lines idle, input mirrored: {}", input_mirrored);

        Ok(ShiftRegisterHD44780Driver {
            pins,
            logical,
            register: ShiftRegister::new(sreg_clk, sreg_clr, sreg_dat, delay),
            pin_e,
            pin_rs,
            pin_rw,
            delay,
            buffer: 0,
            input_mirrored,
        })
    }

    pub fn pins(&self) -> Lcd1602Pins {
        self.pins
    }

    pub fn logical_pins(&self) -> LogicalPins {
        self.logical
    }

    pub fn input_mirrored(&self) -> bool {
        self.input_mirrored
    }

    /// Gets the last byte shifted out, after mirroring. Only useful for debugging.
    pub fn last_byte(&self) -> u8 {
        self.buffer
    }

    fn pulse_e(&self) -> GpioResult<()> {
        self.pin_e.write(false)?;
        self.delay.delay(ENABLE_SETUP);
        self.pin_e.write(true)?;
        self.delay.delay(ENABLE_PULSE_WIDTH);
        self.pin_e.write(false)?;
        self.delay.delay(ENABLE_HOLD);
        Ok(())
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b} ({:#04x}), RS: {}", data, data, rs);

        self.pin_rs.write(rs)?;
        self.pin_rw.write(RW_WRITE)?;

        self.buffer = if self.input_mirrored { mirror_byte(data) } else { data };
        self.register.transmit(self.buffer)?;

        self.pulse_e()
    }
}

impl HD44780Driver for ShiftRegisterHD44780Driver<'_> {
    fn write_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, RS_COMMAND)
    }

    fn write_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, RS_DATA)
    }

    fn settle(&mut self) -> GpioResult<()> {
        self.delay.delay(COMMAND_SETTLE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::driver::{decode_transfers, BusTransfer, CustomChar, CursorDirection};
    use crate::mock::{MockEvent, MockGpioDriver};
    use crate::shift_register::CLEAR_PULSE;
    use crate::GpioError;
    use proptest::prelude::*;
    use std::time::Duration;

    const PINS: Lcd1602Pins = Lcd1602Pins {
        sreg_clk: 0,
        sreg_clr: 1,
        sreg_dat: 2,
        lcd_en: 3,
        lcd_rs: 4,
        lcd_rw: 5,
    };

    fn setup(gpio: &MockGpioDriver, input_mirrored: bool) -> ShiftRegisterHD44780Driver<'_> {
        let config = Lcd1602Config::new(PINS).with_input_mirrored(input_mirrored);
        let driver = ShiftRegisterHD44780Driver::setup(gpio, gpio, config).unwrap();
        gpio.clear_events();
        driver
    }

    fn transfers(gpio: &MockGpioDriver, driver: &ShiftRegisterHD44780Driver) -> Vec<BusTransfer> {
        decode_transfers(&gpio.events(), &driver.logical_pins(), driver.input_mirrored())
    }

    fn commands(gpio: &MockGpioDriver, driver: &ShiftRegisterHD44780Driver) -> Vec<u8> {
        transfers(gpio, driver)
            .into_iter()
            .map(|t| {
                assert!(!t.rs && !t.rw, "expected a command write, got {:?}", t);
                t.byte
            })
            .collect()
    }

    fn settles(gpio: &MockGpioDriver) -> usize {
        gpio.events()
            .into_iter()
            .filter(|e| *e == MockEvent::Delay(COMMAND_SETTLE))
            .count()
    }

    #[test]
    fn mirror_matches_hand_computed_table() {
        let table = [
            (0x00, 0x00),
            (0xFF, 0xFF),
            (0x01, 0x80),
            (0x80, 0x01),
            (0x02, 0x20),
            (0x04, 0x10),
            (0x08, 0x40),
            (0xA5, 0x93),
        ];
        for (byte, mirrored) in table {
            assert_eq!(mirror_byte(byte), mirrored, "mirror_byte({:#04x})", byte);
        }
    }

    #[test]
    fn mirror_is_an_involution_for_every_byte() {
        for byte in 0..=u8::MAX {
            assert_eq!(mirror_byte(mirror_byte(byte)), byte);
        }
    }

    proptest! {
        #[test]
        fn mirror_preserves_bit_count(byte: u8) {
            prop_assert_eq!(mirror_byte(byte).count_ones(), byte.count_ones());
        }
    }

    #[test]
    fn setup_routes_claims_and_idles_every_line() {
        let gpio = MockGpioDriver::new(16);
        let config = Lcd1602Config::new(PINS);
        let driver = ShiftRegisterHD44780Driver::setup(&gpio, &gpio, config).unwrap();
        assert_eq!(driver.pins(), PINS);
        assert_eq!(driver.logical_pins(), config.logical);

        let logical = config.logical;
        let mut expected: Vec<MockEvent> = PINS
            .roles()
            .into_iter()
            .zip(logical.roles())
            .map(|(physical_pin, line)| MockEvent::Function { physical_pin, line })
            .collect();
        expected.extend(logical.roles().map(|line| MockEvent::Output { line }));
        expected.extend([
            MockEvent::Write { line: logical.sreg_clr, value: true },
            MockEvent::Write { line: logical.sreg_clk, value: true },
            MockEvent::Write { line: logical.sreg_dat, value: false },
            MockEvent::Write { line: logical.lcd_en, value: false },
            MockEvent::Write { line: logical.lcd_rs, value: false },
            MockEvent::Write { line: logical.lcd_rw, value: false },
        ]);
        assert_eq!(gpio.events(), expected);
    }

    #[test]
    fn setup_propagates_backend_errors() {
        let gpio = MockGpioDriver::new(16);
        let _held = gpio.get_output(13).unwrap();
        let err = ShiftRegisterHD44780Driver::setup(&gpio, &gpio, Lcd1602Config::new(PINS)).unwrap_err();
        assert_eq!(err, GpioError::AlreadyInUse);

        let small = MockGpioDriver::new(8);
        let err = ShiftRegisterHD44780Driver::setup(&small, &small, Lcd1602Config::new(PINS)).unwrap_err();
        assert_eq!(err, GpioError::InvalidArgument);
    }

    #[test]
    fn write_command_sequence_and_timing() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, false);
        let lines = driver.logical_pins();
        let write = |line: usize, value: bool| MockEvent::Write { line, value };

        driver.write_command(0b0011_1000).unwrap();

        let mut expected = vec![
            write(lines.lcd_rs, false),
            write(lines.lcd_rw, false),
            write(lines.sreg_clr, false),
            MockEvent::Delay(CLEAR_PULSE),
            write(lines.sreg_clr, true),
        ];
        for bit in 0..8 {
            expected.push(write(lines.sreg_clk, false));
            expected.push(write(lines.sreg_dat, 0b0011_1000 & (1 << bit) != 0));
            expected.push(write(lines.sreg_clk, true));
        }
        expected.extend([
            write(lines.lcd_en, false),
            MockEvent::Delay(ENABLE_SETUP),
            write(lines.lcd_en, true),
            MockEvent::Delay(ENABLE_PULSE_WIDTH),
            write(lines.lcd_en, false),
            MockEvent::Delay(ENABLE_HOLD),
        ]);
        assert_eq!(gpio.events(), expected);
    }

    #[test]
    fn timing_windows_are_not_shortened() {
        assert!(ENABLE_SETUP >= Duration::from_micros(1));
        assert!(ENABLE_PULSE_WIDTH >= Duration::from_micros(80));
        assert!(ENABLE_HOLD >= Duration::from_micros(100));
        assert!(COMMAND_SETTLE >= Duration::from_millis(2));
    }

    #[test]
    fn command_and_data_differ_only_in_rs() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);
        let rs = driver.logical_pins().lcd_rs;

        driver.write_command(0x5A).unwrap();
        let command_events = gpio.events();
        gpio.clear_events();
        driver.write_data(0x5A).unwrap();
        let data_events = gpio.events();

        assert_eq!(command_events.len(), data_events.len());
        for (c, d) in command_events.iter().zip(&data_events) {
            match (c, d) {
                (
                    MockEvent::Write { line: lc, value: vc },
                    MockEvent::Write { line: ld, value: vd },
                ) if *lc == rs && *ld == rs => {
                    assert!(!*vc);
                    assert!(*vd);
                }
                _ => assert_eq!(c, d),
            }
        }
    }

    #[test]
    fn mirrored_bytes_are_shifted_out_mirrored() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.write_data(0x01).unwrap();

        assert_eq!(driver.last_byte(), 0x80);
        // Decoding without undoing the mirror shows the raw register contents
        let raw = decode_transfers(&gpio.events(), &driver.logical_pins(), false);
        assert_eq!(raw, vec![BusTransfer { rs: true, rw: false, byte: 0x80 }]);
        assert_eq!(transfers(&gpio, &driver)[0].byte, 0x01);
    }

    #[test]
    fn unmirrored_bytes_pass_through() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, false);

        driver.write_data(0x01).unwrap();

        assert_eq!(driver.last_byte(), 0x01);
        assert_eq!(transfers(&gpio, &driver)[0].byte, 0x01);
    }

    #[test]
    fn initialize_display_sends_mode_sequence() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.initialize_display().unwrap();

        // entry mode: increment, no shift; display: on, cursor off, blink off; 8-bit, 2 lines, 5x8
        assert_eq!(commands(&gpio, &driver), vec![0x06, 0x0C, 0x38]);
        assert_eq!(gpio.events()[0], MockEvent::Delay(COMMAND_SETTLE));
    }

    #[test]
    fn clear_display_clears_then_returns_home() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.clear_display().unwrap();

        assert_eq!(commands(&gpio, &driver), vec![0x01, 0x02]);
        assert_eq!(gpio.events()[0], MockEvent::Delay(COMMAND_SETTLE));
    }

    #[test]
    fn goto_addresses_rows_64_apart() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.goto(0, 0).unwrap();
        driver.goto(5, 1).unwrap();
        driver.goto(15, 1).unwrap();

        assert_eq!(commands(&gpio, &driver), vec![0x80, 0xC5, 0xCF]);
        assert_eq!(settles(&gpio), 3);
    }

    #[test]
    fn goto_wraps_through_the_address_mask() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, false);

        // 2 * 64 + 3 = 131, masked to 3
        driver.goto(3, 2).unwrap();
        // 1 * 64 + 70 = 134, masked to 6
        driver.goto(70, 1).unwrap();

        assert_eq!(commands(&gpio, &driver), vec![0x83, 0x86]);
    }

    #[test]
    fn ddram_address_is_reduced_modulo_128() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        for address in [0x00, 0x27, 0x40, 0x7F, 0x80, 0xC5, 0xFF] {
            driver.set_ddram_address(address).unwrap();
        }

        assert_eq!(
            commands(&gpio, &driver),
            vec![0x80, 0xA7, 0xC0, 0xFF, 0x80, 0xC5, 0xFF]
        );
    }

    #[test]
    fn cgram_address_is_masked_to_6_bits() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.set_cgram_address(0x3F).unwrap();
        driver.set_cgram_address(0x48).unwrap();

        assert_eq!(commands(&gpio, &driver), vec![0x7F, 0x48]);
    }

    #[test]
    fn create_custom_char_masks_the_slot() {
        const BELL: [u8; 8] = [0x04, 0x0E, 0x0E, 0x0E, 0x1F, 0x00, 0x04, 0x00];

        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);
        driver.create_custom_char(CustomChar::new(11, BELL)).unwrap();
        let slot_11 = transfers(&gpio, &driver);

        gpio.clear_events();
        driver.create_custom_char(CustomChar::new(3, BELL)).unwrap();
        let slot_3 = transfers(&gpio, &driver);

        assert_eq!(slot_11, slot_3);
        assert_eq!(slot_3[0], BusTransfer { rs: false, rw: false, byte: 0x43 });
        let rows: Vec<u8> = slot_3[1..]
            .iter()
            .map(|t| {
                assert!(t.rs);
                t.byte
            })
            .collect();
        assert_eq!(rows, BELL);
    }

    #[test]
    fn draw_str_writes_one_data_byte_per_char() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.draw_str("Hello, LCD").unwrap();

        let written = transfers(&gpio, &driver);
        assert!(written.iter().all(|t| t.rs && !t.rw));
        let bytes: Vec<u8> = written.iter().map(|t| t.byte).collect();
        assert_eq!(bytes, b"Hello, LCD");
    }

    #[test]
    fn draw_str_replaces_non_ascii() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, false);

        driver.draw_str("25°C").unwrap();

        let bytes: Vec<u8> = transfers(&gpio, &driver).iter().map(|t| t.byte).collect();
        assert_eq!(bytes, b"25?C");
    }

    #[test]
    fn draw_str_of_nothing_writes_nothing() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.draw_str("").unwrap();

        assert!(gpio.events().is_empty());
    }

    #[test]
    fn draw_bytes_passes_codes_through() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.draw_bytes(&[0x00, 0x07, 0xDF]).unwrap();

        let bytes: Vec<u8> = transfers(&gpio, &driver).iter().map(|t| t.byte).collect();
        assert_eq!(bytes, vec![0x00, 0x07, 0xDF]);
    }

    #[test]
    fn instruction_flags() {
        let gpio = MockGpioDriver::new(16);
        let mut driver = setup(&gpio, true);

        driver.return_home().unwrap();
        driver.set_entry_mode(CursorDirection::Left, true).unwrap();
        driver.set_display_control(true, true, true).unwrap();
        driver.set_display_control(false, false, false).unwrap();
        driver.cursor_shift(true, CursorDirection::Right).unwrap();
        driver.cursor_shift(false, CursorDirection::Left).unwrap();
        driver.function_set(false, false, true).unwrap();

        assert_eq!(
            commands(&gpio, &driver),
            vec![0x02, 0x05, 0x0F, 0x08, 0x1C, 0x10, 0x24]
        );
        assert_eq!(settles(&gpio), 0);
    }

    proptest! {
        #[test]
        fn any_byte_survives_the_wire(byte: u8, mirrored: bool, data: bool) {
            let gpio = MockGpioDriver::new(16);
            let mut driver = setup(&gpio, mirrored);

            if data {
                driver.write_data(byte).unwrap();
            } else {
                driver.write_command(byte).unwrap();
            }

            prop_assert_eq!(
                transfers(&gpio, &driver),
                vec![BusTransfer { rs: data, rw: false, byte }]
            );
        }
    }
}
