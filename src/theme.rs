//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::elements::{ELEMENT_COUNT, ElementKind};
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Element and UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours by element index: H, O, Na, Cl, N, C.
    pub elements: [Color; ELEMENT_COUNT],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, labels).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Inactive / secondary text.
    pub inactive_fg: Color,
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
        Self::catalog_default()
    }
}

impl Theme {
    /// Built-in defaults: element colours from the catalog (H white, O red,
    /// Na grey, Cl green, N blue, C dark grey), UI colours in One Dark hues.
    pub fn catalog_default() -> Self {
        let mut elements = [Color::Reset; ELEMENT_COUNT];
        for kind in ElementKind::ALL {
            elements[kind.index()] = kind.info().color;
        }
        Self {
            elements,
            bg: parse_hex("#31353F").unwrap(),
            div_line: parse_hex("#3F444F").unwrap(),
            main_fg: parse_hex("#ABB2BF").unwrap(),
            title: parse_hex("#E5C07B").unwrap(),
            inactive_fg: parse_hex("#5C6370").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to catalog defaults if path is None or file is missing/invalid.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
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

    /// Default theme for a palette when no file is loaded.
    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::catalog_default();
        t.apply_palette(palette);
        t
    }

    /// Override element colours for high-contrast or colorblind display.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                // Saturated colours on dark bg, one hue per element.
                self.elements = [
                    parse_hex("#FFFFFF").unwrap(), // H white
                    parse_hex("#FF0000").unwrap(), // O red
                    parse_hex("#FFFF00").unwrap(), // Na yellow
                    parse_hex("#00FF00").unwrap(), // Cl green
                    parse_hex("#0088FF").unwrap(), // N blue
                    parse_hex("#FF00FF").unwrap(), // C magenta
                ];
            }
            crate::Palette::Colorblind => {
                // Avoid red/green alone; symbols disambiguate the rest.
                self.elements = [
                    parse_hex("#FFFFFF").unwrap(), // H white
                    parse_hex("#EE7733").unwrap(), // O orange
                    parse_hex("#BBBB00").unwrap(), // Na yellow
                    parse_hex("#009988").unwrap(), // Cl teal
                    parse_hex("#0077BB").unwrap(), // N blue
                    parse_hex("#EE3377").unwrap(), // C magenta
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let defaults = Self::catalog_default();
        // Keys match btop themes, picked so hues stay chemistry-plausible:
        // H bright text, O the red accent, Na secondary grey, Cl the green
        // box, N the blue box, C the divider grey.
        Self {
            elements: [
                get("main_fg").unwrap_or(defaults.elements[0]),
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or(defaults.elements[1]),
                get("inactive_fg").unwrap_or(defaults.elements[2]),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or(defaults.elements[3]),
                get("cpu_box").unwrap_or(defaults.elements[4]),
                get("div_line").unwrap_or(defaults.elements[5]),
            ],
            bg: get("meter_bg").unwrap_or(defaults.bg),
            div_line: get("div_line").unwrap_or(defaults.div_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            inactive_fg: get("inactive_fg").unwrap_or(defaults.inactive_fg),
        }
    }

    /// Piece colour for an element kind.
    #[inline]
    pub fn element_color(&self, kind: ElementKind) -> Color {
        self.elements[kind.index()]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_default_element_colours_follow_catalog() {
        let theme = Theme::default();
        for kind in ElementKind::ALL {
            assert_eq!(theme.element_color(kind), kind.info().color);
        }
    }
}
