use image::Rgba;

/// Dashboard palette. Probe series colours can be overridden from the
/// controller's personalization settings; anything past the override
/// list falls back to the hue-stepped defaults.
pub struct Palette {
    pub background: Rgba<u8>,
    pub header: Rgba<u8>,
    pub text: Rgba<u8>,
    pub muted: Rgba<u8>,
    pub grid: Rgba<u8>,
    pub temperature: Rgba<u8>,
    pub target: Rgba<u8>,
    pub fan: Rgba<u8>,
    pub alert: Rgba<u8>,
    pub probe_overrides: Vec<Rgba<u8>>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba([16, 16, 20, 255]),  // Near-black backdrop
            header: Rgba([114, 159, 207, 255]),   // Steel blue - for headers
            text: Rgba([238, 238, 236, 255]),     // Off-white - for general text
            muted: Rgba([136, 138, 133, 255]),    // Grey - for secondary text
            grid: Rgba([60, 60, 60, 255]),        // Dark grey - for separators and grid
            temperature: Rgba([245, 121, 0, 255]), // Burnt orange - current temperature
            target: Rgba([87, 174, 36, 255]),     // Vibrant green - target line
            fan: Rgba([0, 188, 212, 255]),        // Cyan - fan state and bar
            alert: Rgba([204, 0, 0, 255]),        // Crimson - offline / error notes
            probe_overrides: Vec::new(),
        }
    }
}

impl Palette {
    /// Apply personalization colour strings (`#rrggbb`); entries that do
    /// not parse are ignored.
    pub fn with_overrides(colours: &[String]) -> Self {
        Self {
            probe_overrides: colours.iter().filter_map(|c| parse_hex(c)).collect(),
            ..Default::default()
        }
    }

    /// Series colour for a probe index: override if present, otherwise
    /// hues stepped 137.5° apart so neighbouring probes stay distinct.
    pub fn probe_colour(&self, index: usize) -> Rgba<u8> {
        if let Some(colour) = self.probe_overrides.get(index) {
            return *colour;
        }
        let hue = (index as f32 * 137.5) % 360.0;
        hsl_to_rgba(hue, 0.7, 0.5)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgba([r, g, b, 255]))
}

fn hsl_to_rgba(hue: f32, saturation: f32, lightness: f32) -> Rgba<u8> {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match hue as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgba([
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
        255,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_hex("00ff00"), Some(Rgba([0, 255, 0, 255])));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("zzzzzz"), None);
    }

    #[test]
    fn test_probe_colours_are_distinct() {
        let palette = Palette::default();
        let colours: Vec<_> = (0..6).map(|i| palette.probe_colour(i)).collect();
        for i in 0..colours.len() {
            for j in (i + 1)..colours.len() {
                assert_ne!(colours[i], colours[j], "probes {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn test_first_probe_is_red_family() {
        // hue 0 at 70% saturation leans red
        let colour = Palette::default().probe_colour(0);
        assert!(colour[0] > colour[1]);
        assert!(colour[0] > colour[2]);
    }

    #[test]
    fn test_overrides_win() {
        let palette =
            Palette::with_overrides(&["#112233".to_string(), "bogus".to_string()]);
        assert_eq!(palette.probe_colour(0), Rgba([0x11, 0x22, 0x33, 255]));
        // the unparseable entry is dropped, index 1 falls back to defaults
        assert_ne!(palette.probe_colour(1), Rgba([0x11, 0x22, 0x33, 255]));
    }
}
