mod config;

use std::env::var;
use std::str::FromStr;
use std::time::Duration;
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use time::OffsetDateTime;
use shiftlcd_gpio::{Delay, GpioDriver, ThreadDelay};
use shiftlcd_gpio::gpiod::GpiodDriver;
use shiftlcd_gpio::lcd::hd44780::driver::{
    decode_transfers, HD44780Driver, Lcd1602Config, Lcd1602Pins, LogicalPins,
    ShiftRegisterHD44780Driver,
};
use shiftlcd_gpio::mock::MockGpioDriver;
use shiftlcd_gpio::raw::RawGpioDriver;
use crate::config::Config;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Backend {
    /// Memory-mapped BCM283x registers.
    Raw,
    /// Linux GPIO character device.
    Gpiod,
    /// No hardware: record the bus traffic and log it.
    Mock,
}

impl FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Backend::Raw),
            "gpiod" => Ok(Backend::Gpiod),
            "mock" => Ok(Backend::Mock),
            _ => Err(eyre::eyre!("Unknown GPIO backend: {}", s)),
        }
    }
}

fn parse_pin(name: &str) -> eyre::Result<usize> {
    let value = var(name).map_err(|_| eyre::eyre!("{} is not set", name))?;
    Ok(value.trim().parse()?)
}

fn pins_from_env() -> eyre::Result<Lcd1602Pins> {
    Ok(Lcd1602Pins {
        sreg_clk: parse_pin("SHIFTLCD_PIN_SREG_CLK")?,
        sreg_clr: parse_pin("SHIFTLCD_PIN_SREG_CLR")?,
        sreg_dat: parse_pin("SHIFTLCD_PIN_SREG_DAT")?,
        lcd_en: parse_pin("SHIFTLCD_PIN_LCD_EN")?,
        lcd_rs: parse_pin("SHIFTLCD_PIN_LCD_RS")?,
        lcd_rw: parse_pin("SHIFTLCD_PIN_LCD_RW")?,
    })
}

/// Draws the banner, then redraws the clock row every `refresh_ms`.
///
/// Runs forever unless `frames` is given.
fn run(
    gpio: &dyn GpioDriver,
    delay: &dyn Delay,
    lcd_config: Lcd1602Config,
    config: &Config,
    frames: Option<usize>,
) -> eyre::Result<()> {
    debug!("Initializing LCD driver...");
    let mut lcd = ShiftRegisterHD44780Driver::setup(gpio, delay, lcd_config)?;

    lcd.initialize_display()?;
    lcd.clear_display()?;

    for glyph in &config.glyphs {
        lcd.create_custom_char(glyph.into())?;
    }

    lcd.goto(0, 0)?;
    lcd.draw_str(&config.banner)?;

    debug!("{:?} initialized.", lcd);

    info!("Starting main loop...");

    let mut frame = 0;
    while frames.is_none_or(|frames| frame < frames) {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let (h, m, s) = now.to_hms();

        lcd.goto(0, 1)?;
        if let Some(glyph) = config.glyphs.first() {
            lcd.draw_bytes(&[glyph.slot])?;
            lcd.draw_str(" ")?;
        }
        lcd.draw_str(&format!("{:02}:{:02}:{:02}", h, m, s))?;

        delay.delay(Duration::from_millis(config.refresh_ms));
        frame += 1;
    }

    Ok(())
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("shiftlcd demo starting...");
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let backend: Backend = var("SHIFTLCD_BACKEND")
        .unwrap_or_else(|_| "raw".to_string())
        .parse()?;
    let pins = pins_from_env()?;

    info!("LCD @ CLK: {}, CLR: {}, DAT: {}, EN: {}, RS: {}, RW: {} via {:?}",
        pins.sreg_clk, pins.sreg_clr, pins.sreg_dat, pins.lcd_en, pins.lcd_rs, pins.lcd_rw, backend);

    debug!("Trying to load config...");
    let config = Config::load_or_init()?;

    let lcd_config = Lcd1602Config::new(pins).with_input_mirrored(config.input_mirrored);

    match backend {
        Backend::Raw => {
            let gpio = RawGpioDriver::new_gpiomem()?;
            debug!("{:?} initialized.", gpio);
            let lcd_config = lcd_config.with_logical_pins(LogicalPins::identity(&pins));
            run(&gpio, &ThreadDelay, lcd_config, &config, None)?;
        }
        Backend::Gpiod => {
            let chip = var("SHIFTLCD_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
            let gpio = GpiodDriver::open(&chip)?;
            debug!("{:?} initialized.", gpio);
            let lcd_config = lcd_config.with_logical_pins(LogicalPins::identity(&pins));
            run(&gpio, &ThreadDelay, lcd_config, &config, None)?;
        }
        Backend::Mock => {
            let gpio = MockGpioDriver::new(64);
            run(&gpio, &gpio, lcd_config, &config, Some(1))?;

            let transfers = decode_transfers(&gpio.events(), &lcd_config.logical, lcd_config.input_mirrored);
            for transfer in &transfers {
                let kind = if transfer.rs { "data" } else { "cmd " };
                info!("{} {:08b} ({:#04x})", kind, transfer.byte, transfer.byte);
            }
            info!("{} transfers, {:?} spent waiting", transfers.len(), gpio.total_delay());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!("raw".parse::<Backend>().unwrap(), Backend::Raw);
        assert_eq!("gpiod".parse::<Backend>().unwrap(), Backend::Gpiod);
        assert_eq!("mock".parse::<Backend>().unwrap(), Backend::Mock);
        assert!("spi".parse::<Backend>().is_err());
    }

    #[test]
    fn dry_run_draws_banner_and_clock() {
        let gpio = MockGpioDriver::new(64);
        let pins = Lcd1602Pins {
            sreg_clk: 30,
            sreg_clr: 31,
            sreg_dat: 32,
            lcd_en: 33,
            lcd_rs: 34,
            lcd_rw: 35,
        };
        let lcd_config = Lcd1602Config::new(pins);
        let config = Config {
            banner: "Hi".to_string(),
            ..Config::default()
        };

        run(&gpio, &gpio, lcd_config, &config, Some(1)).unwrap();

        let transfers = decode_transfers(&gpio.events(), &lcd_config.logical, true);
        let commands: Vec<u8> = transfers.iter().filter(|t| !t.rs).map(|t| t.byte).collect();
        // init, clear + home, glyph slot 0, row 0, row 1
        assert_eq!(commands, vec![0x06, 0x0C, 0x38, 0x01, 0x02, 0x40, 0x80, 0xC0]);

        let data: Vec<u8> = transfers.iter().filter(|t| t.rs).map(|t| t.byte).collect();
        // 8 glyph rows, banner, glyph code, space, hh:mm:ss
        assert_eq!(data.len(), 8 + 2 + 1 + 1 + 8);
        assert_eq!(&data[8..10], b"Hi");
        assert_eq!(data[10], 0);
        assert_eq!(data[11], b' ');
        assert_eq!(data[14], b':');
        assert_eq!(data[17], b':');
    }
}
