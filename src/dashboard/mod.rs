use image::{DynamicImage, RgbaImage};
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::history::TempWindow;
use crate::models::DashboardInfo;
use crate::renderer::colours::Palette;
use crate::renderer::drawing;
use crate::renderer::fonts::FontSet;
use crate::renderer::widgets::{self, RenderContext};

/// Failures writing the rendered dashboard out. A missing font is not an
/// error; rendering degrades to label-free output instead.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to save dashboard to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Compose the dashboard image: header band, temperature chart on the
/// left, status panel on the right, status footer.
pub fn create_image(
    config: &AppConfig,
    info: &DashboardInfo,
    window: &TempWindow,
    fonts: Option<&FontSet>,
    palette: &Palette,
) -> DynamicImage {
    let width = config.dashboard.width.max(160);
    let height = config.dashboard.height.max(120);

    let mut image = RgbaImage::new(width, height);
    drawing::fill_background(&mut image, palette.background);

    // Layout bands
    let y_body = 40u32;
    let y_footer = height.saturating_sub(26);
    let x_split = (width as f32 * 0.65) as u32;

    let mut header_ctx = RenderContext {
        info,
        window,
        image: &mut image,
        fonts,
        palette,
        x: 0,
        y: 0,
        width,
        height: y_body,
    };
    widgets::render_header(&mut header_ctx);

    drawing::horizontal_line(&mut image, 0, y_body, width, palette.grid);
    drawing::vertical_line(&mut image, x_split, y_body, y_footer, palette.grid);

    let mut chart_ctx = RenderContext {
        info,
        window,
        image: &mut image,
        fonts,
        palette,
        x: 0,
        y: y_body + 4,
        width: x_split,
        height: y_footer - y_body - 8,
    };
    widgets::render_chart(&mut chart_ctx);

    let mut panel_ctx = RenderContext {
        info,
        window,
        image: &mut image,
        fonts,
        palette,
        x: x_split,
        y: y_body + 4,
        width: width - x_split,
        height: y_footer - y_body - 8,
    };
    widgets::render_status_panel(&mut panel_ctx);

    drawing::horizontal_line(&mut image, 0, y_footer, width, palette.grid);

    let mut footer_ctx = RenderContext {
        info,
        window,
        image: &mut image,
        fonts,
        palette,
        x: 0,
        y: y_footer + 5,
        width,
        height: height - y_footer,
    };
    widgets::render_footer(&mut footer_ctx);

    DynamicImage::ImageRgba8(image)
}

pub fn save_image(config: &AppConfig, image: &DynamicImage) -> Result<(), RenderError> {
    let path = &config.dashboard.file;
    image.save(path).map_err(|source| RenderError::Save {
        path: path.clone(),
        source,
    })
}
