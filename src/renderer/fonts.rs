use log::{debug, warn};
use rusttype::{Font, Scale};
use std::fs;
use std::path::Path;

/// Well-known monospace/sans locations tried after the configured path.
const DEFAULT_FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
];

pub struct FontConfig {
    pub font: Font<'static>,
    pub scale: Scale,
}

/// The three text sizes the dashboard uses. Loaded once per run; when
/// no font file is found the dashboard renders without labels.
pub struct FontSet {
    pub title: FontConfig,
    pub regular: FontConfig,
    pub small: FontConfig,
}

impl FontSet {
    pub fn load(configured: Option<&str>) -> Option<FontSet> {
        let font = configured
            .and_then(try_load_path)
            .or_else(|| DEFAULT_FONT_PATHS.iter().copied().find_map(try_load_path))?;

        Some(FontSet {
            title: FontConfig {
                font: font.clone(),
                scale: Scale::uniform(28.0),
            },
            regular: FontConfig {
                font: font.clone(),
                scale: Scale::uniform(20.0),
            },
            small: FontConfig {
                font,
                scale: Scale::uniform(16.0),
            },
        })
    }
}

fn try_load_path(path: &str) -> Option<Font<'static>> {
    if !Path::new(path).is_file() {
        return None;
    }
    match fs::read(path) {
        Ok(bytes) => match Font::try_from_vec(bytes) {
            Some(font) => {
                debug!("loaded font from {}", path);
                Some(font)
            }
            None => {
                warn!("{} is not a usable TTF", path);
                None
            }
        },
        Err(e) => {
            warn!("could not read font {}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_path() {
        assert!(try_load_path("/nonexistent/font.ttf").is_none());
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a font").unwrap();
        assert!(try_load_path(file.path().to_str().unwrap()).is_none());
    }
}
