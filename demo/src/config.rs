use std::path::{Path, PathBuf};
use dotenv::var;
use log::{info, warn};
use serde::{Serialize, Deserialize};
use shiftlcd_gpio::lcd::hd44780::driver::CustomChar;

/// A glyph uploaded to CGRAM.
///
/// The CGRAM address is set to `slot & 7` before the eight rows are written, so only slots whose
/// low three bits are zero start on a glyph boundary. Any other slot overwrites rows of its
/// neighbours.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GlyphConfig {
    pub slot: u8,
    pub rows: [u8; 8],
}

impl GlyphConfig {
    /// Whether the rows land on the glyph shown by character code `slot`.
    pub fn is_aligned(&self) -> bool {
        self.slot & 0x07 == 0
    }
}

impl From<&GlyphConfig> for CustomChar {
    fn from(glyph: &GlyphConfig) -> Self {
        CustomChar::new(glyph.slot, glyph.rows)
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Whether the shift register outputs need the bit remapping.
    pub input_mirrored: bool,
    /// Text for the first row.
    pub banner: String,
    /// Glyphs uploaded to CGRAM at startup.
    pub glyphs: Vec<GlyphConfig>,
    /// How often the clock on the second row is redrawn.
    pub refresh_ms: u64,
}

impl Config {
    fn path() -> PathBuf {
        var("CONFIG_FILE").unwrap_or_else(|_| "shiftlcd.json".to_string()).into()
    }

    /// Loads the config file, or `None` if it does not exist.
    fn try_load_from(path: &Path) -> eyre::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .map_err(|e| eyre::eyre!("Malformed config {}: {}", path.display(), e))?;
        config.warn_unaligned_glyphs();
        Ok(Some(config))
    }

    /// Loads the config file, writing the defaults to it first if it does not exist.
    pub fn load_or_init() -> eyre::Result<Self> {
        Self::load_or_init_at(&Self::path())
    }

    fn load_or_init_at(path: &Path) -> eyre::Result<Self> {
        if let Some(config) = Self::try_load_from(path)? {
            info!("Config loaded.");
            return Ok(config);
        }
        info!("Config not found. Using default");
        let config = Config::default();
        config.save_to(path)?;
        info!("Default config saved.");
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn warn_unaligned_glyphs(&self) {
        for glyph in self.glyphs.iter().filter(|glyph| !glyph.is_aligned()) {
            warn!("Glyph in slot {} overlaps its neighbours in CGRAM", glyph.slot);
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_mirrored: true,
            banner: "Hello, LCD1602!".to_string(),
            glyphs: vec![
                // Bell
                GlyphConfig {
                    slot: 0,
                    rows: [0x04, 0x0E, 0x0E, 0x0E, 0x1F, 0x00, 0x04, 0x00],
                },
            ],
            refresh_ms: 1000,
        }
    }
}
