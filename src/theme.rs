//! Theme loading: btop-style `theme[key]="value"` and hex -> ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Piece and UI colours loaded from a theme file.
///
/// Piece indices follow the classic assignment: I cyan, O yellow, T magenta,
/// S green, Z red, J blue, L orange.
#[derive(Debug, Clone)]
pub struct Theme {
    pub pieces: [Color; 7],
    /// Playfield border and grid.
    pub border: Color,
    /// Text (score, level, time).
    pub main_fg: Color,
    /// Highlight / titles / banners.
    pub title: Color,
    /// Ghost piece and the spent hold box.
    pub inactive_fg: Color,
    /// Flash for rows awaiting their clear.
    pub flash: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults, hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            pieces: [
                parse_hex("#56B6C2").unwrap(), // I cyan
                parse_hex("#E5C07B").unwrap(), // O yellow
                parse_hex("#C678DD").unwrap(), // T magenta
                parse_hex("#98C379").unwrap(), // S green
                parse_hex("#E06C75").unwrap(), // Z red
                parse_hex("#61AFEF").unwrap(), // J blue
                parse_hex("#D19A66").unwrap(), // L orange
            ],
            border: parse_hex("#3F444F").unwrap(),
            main_fg: parse_hex("#ABB2BF").unwrap(),
            title: parse_hex("#E5C07B").unwrap(),
            inactive_fg: parse_hex("#5C6370").unwrap(),
            flash: parse_hex("#FFFFFF").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"`.
    /// Falls back to One Dark defaults if path is None or the file is
    /// missing/invalid. `palette` selects the colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override piece colours for high-contrast or colorblind variants.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    parse_hex("#00FFFF").unwrap(), // I
                    parse_hex("#FFFF00").unwrap(), // O
                    parse_hex("#FF00FF").unwrap(), // T
                    parse_hex("#00FF00").unwrap(), // S
                    parse_hex("#FF0000").unwrap(), // Z
                    parse_hex("#0088FF").unwrap(), // J
                    parse_hex("#FF8800").unwrap(), // L
                ];
            }
            crate::Palette::Colorblind => {
                // avoid red/green pairs; lean on blue/orange/teal contrast
                self.pieces = [
                    parse_hex("#33BBEE").unwrap(), // I
                    parse_hex("#BBBB00").unwrap(), // O
                    parse_hex("#EE3377").unwrap(), // T
                    parse_hex("#009988").unwrap(), // S
                    parse_hex("#CC3311").unwrap(), // Z
                    parse_hex("#0077BB").unwrap(), // J
                    parse_hex("#EE7733").unwrap(), // L
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys match onedark.theme; fallbacks are that file's hex values.
        Self {
            pieces: [
                get("hi_fg")
                    .or_else(|| get("proc_misc"))
                    .unwrap_or_else(|| parse_hex("#56B6C2").unwrap()),
                get("title")
                    .or_else(|| get("cpu_mid"))
                    .unwrap_or_else(|| parse_hex("#E5C07B").unwrap()),
                get("net_box").unwrap_or_else(|| parse_hex("#C678DD").unwrap()),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or_else(|| parse_hex("#98C379").unwrap()),
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or_else(|| parse_hex("#E06C75").unwrap()),
                get("cpu_box").unwrap_or_else(|| parse_hex("#61AFEF").unwrap()),
                get("temp_mid")
                    .or_else(|| get("download"))
                    .unwrap_or_else(|| parse_hex("#D19A66").unwrap()),
            ],
            border: get("div_line").unwrap_or_else(|| parse_hex("#3F444F").unwrap()),
            main_fg: get("main_fg").unwrap_or_else(|| parse_hex("#ABB2BF").unwrap()),
            title: get("title").unwrap_or_else(|| parse_hex("#E5C07B").unwrap()),
            inactive_fg: get("inactive_fg").unwrap_or_else(|| parse_hex("#5C6370").unwrap()),
            flash: parse_hex("#FFFFFF").unwrap(),
        }
    }

    /// Piece colour for colour index (0..7).
    #[inline]
    pub fn piece_color(&self, index: u8) -> Color {
        self.pieces[(index as usize) % 7]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let (r, g, b) = if s.len() == 6 {
        let r =
            u8::from_str_radix(&s[0..2], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let g =
            u8::from_str_radix(&s[2..4], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let b =
            u8::from_str_radix(&s[4..6], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let g = u8::from_str_radix(&s[1..2], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let b = u8::from_str_radix(&s[2..3], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        (r, g, b)
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}
