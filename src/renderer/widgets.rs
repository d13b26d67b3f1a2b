use chrono::{DateTime, Local, Utc};
use image::RgbaImage;

use crate::models::history::TempWindow;
use crate::models::DashboardInfo;
use crate::renderer::colours::Palette;
use crate::renderer::drawing;
use crate::renderer::fonts::FontSet;

/// State shared by every widget for one render pass. `fonts` is `None`
/// when no TTF could be loaded; widgets then skip labels but still draw
/// lines, bars and series.
pub struct RenderContext<'a> {
    pub info: &'a DashboardInfo,
    pub window: &'a TempWindow,
    pub image: &'a mut RgbaImage,
    pub fonts: Option<&'a FontSet>,
    pub palette: &'a Palette,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub fn render_header(ctx: &mut RenderContext) {
    let Some(fonts) = ctx.fonts else {
        return;
    };

    drawing::text(
        ctx.image,
        ctx.palette.header,
        (ctx.x + 10) as i32,
        (ctx.y + 4) as i32,
        &fonts.title,
        &ctx.info.device_name,
    );

    // Current time at top right
    let clock = Local::now().format("%H:%M:%S").to_string();
    drawing::text(
        ctx.image,
        ctx.palette.header,
        (ctx.x + ctx.width) as i32 - 110,
        (ctx.y + 8) as i32,
        &fonts.regular,
        &clock,
    );
}

pub fn render_status_panel(ctx: &mut RenderContext) {
    let x = (ctx.x + 12) as i32;
    let inner_width = ctx.width.saturating_sub(24);

    if let Some(fonts) = ctx.fonts {
        drawing::text(ctx.image, ctx.palette.muted, x, (ctx.y + 6) as i32, &fonts.small, "CURRENT");
        drawing::text(
            ctx.image,
            ctx.palette.temperature,
            x,
            (ctx.y + 26) as i32,
            &fonts.title,
            &ctx.info.temperature_display,
        );

        drawing::text(ctx.image, ctx.palette.muted, x, (ctx.y + 68) as i32, &fonts.small, "TARGET");
        drawing::text(
            ctx.image,
            ctx.palette.target,
            x,
            (ctx.y + 88) as i32,
            &fonts.title,
            &ctx.info.target_display,
        );

        let fan_text = format!("FAN {} | {}", ctx.info.fan_display, ctx.info.fan_speed_display);
        drawing::text(ctx.image, ctx.palette.fan, x, (ctx.y + 132) as i32, &fonts.regular, &fan_text);
    }

    // Fan duty bar; a fan that is on without a reported speed shows full.
    let fraction = match (ctx.info.fan_speed, ctx.info.fan_on) {
        (Some(speed), _) => (speed / 100.0) as f32,
        (None, Some(true)) => 1.0,
        _ => 0.0,
    };
    drawing::progress_bar(
        ctx.image,
        x,
        (ctx.y + 160) as i32,
        inner_width,
        14,
        fraction,
        ctx.palette.fan,
    );

    // Per-probe readout with series colour swatches
    let mut y_pos = ctx.y + 194;
    let probes = ctx.window.probes();
    for (index, probe) in probes.iter().enumerate() {
        if y_pos + 16 > ctx.y + ctx.height {
            break;
        }
        drawing::filled_rect(
            ctx.image,
            x,
            y_pos as i32,
            10,
            10,
            ctx.palette.probe_colour(index),
        );
        if let Some(fonts) = ctx.fonts {
            let reading = ctx
                .window
                .latest(*probe)
                .map(|(_, value)| ctx.info.format_value(value))
                .unwrap_or_else(|| "--".to_string());
            let label = format!("Probe {}  {}", probe, reading);
            drawing::text(
                ctx.image,
                ctx.palette.text,
                x + 18,
                y_pos as i32 - 3,
                &fonts.small,
                &label,
            );
        }
        y_pos += 22;
    }
}

pub fn render_chart(ctx: &mut RenderContext) {
    let info = ctx.info;
    let window = ctx.window;
    let palette = ctx.palette;
    let fonts = ctx.fonts;
    let image = &mut *ctx.image;

    let left = ctx.x + 48;
    let right = ctx.x + ctx.width.saturating_sub(8);
    let top = ctx.y + 8;
    let bottom = ctx.y + ctx.height.saturating_sub(24);

    // Axis frame
    drawing::vertical_line(image, left, top, bottom, palette.grid);
    drawing::horizontal_line(image, left, bottom, right - left, palette.grid);

    let Some((t_min, t_max, v_min, v_max)) = window.bounds() else {
        if let Some(fonts) = fonts {
            drawing::text(
                image,
                palette.muted,
                (left + (right - left) / 2) as i32 - 60,
                (top + (bottom - top) / 2) as i32,
                &fonts.regular,
                "No history yet",
            );
        }
        return;
    };

    // Scale in display units, stretched to include the target line.
    let mut lo = info.display_value(v_min);
    let mut hi = info.display_value(v_max);
    if let Some(target) = info.target {
        let target = info.display_value(target);
        lo = lo.min(target);
        hi = hi.max(target);
    }
    let pad = ((hi - lo) * 0.05).max(2.0);
    lo -= pad;
    hi += pad;

    let t_span = (t_max - t_min).num_seconds().max(60) as f64;
    let x_span = (right - left) as f64;
    let y_span = (bottom - top) as f64;

    let to_x = |t: DateTime<Utc>| left as f64 + (t - t_min).num_seconds() as f64 / t_span * x_span;
    let to_y_display = |display: f64| bottom as f64 - (display - lo) / (hi - lo) * y_span;
    let to_y = |raw: f64| to_y_display(info.display_value(raw));

    // Horizontal grid with value labels
    for step in 0..=4 {
        let value = lo + (hi - lo) * f64::from(step) / 4.0;
        let y = to_y_display(value) as u32;
        if step > 0 {
            drawing::horizontal_line(image, left, y, right - left, palette.grid);
        }
        if let Some(fonts) = fonts {
            drawing::text(
                image,
                palette.muted,
                ctx.x as i32 + 2,
                y as i32 - 8,
                &fonts.small,
                &format!("{:>4.0}", value),
            );
        }
    }

    // Time labels at the extremes
    if let Some(fonts) = fonts {
        let start = t_min.with_timezone(&Local).format("%H:%M").to_string();
        let end = t_max.with_timezone(&Local).format("%H:%M").to_string();
        drawing::text(image, palette.muted, left as i32, (bottom + 4) as i32, &fonts.small, &start);
        drawing::text(
            image,
            palette.muted,
            right as i32 - 42,
            (bottom + 4) as i32,
            &fonts.small,
            &end,
        );
    }

    // Target setpoint as a dashed line
    if let Some(target) = info.target {
        let y = to_y(target) as u32;
        if y > top && y < bottom {
            drawing::dashed_horizontal_line(image, left, y, right - left, 6, palette.target);
        }
    }

    // One series per probe
    for (index, probe) in window.probes().iter().enumerate() {
        let Some(series) = window.series(*probe) else {
            continue;
        };
        let points: Vec<(f32, f32)> = series
            .iter()
            .map(|(t, v)| (to_x(*t) as f32, to_y(*v) as f32))
            .collect();
        let colour = palette.probe_colour(index);
        if points.len() == 1 {
            drawing::filled_rect(image, points[0].0 as i32 - 1, points[0].1 as i32 - 1, 3, 3, colour);
        } else {
            drawing::polyline(image, &points, colour);
        }
    }
}

pub fn render_footer(ctx: &mut RenderContext) {
    let Some(fonts) = ctx.fonts else {
        return;
    };

    let colour = if ctx.info.online {
        ctx.palette.muted
    } else {
        ctx.palette.alert
    };
    drawing::text(
        ctx.image,
        colour,
        (ctx.x + 10) as i32,
        ctx.y as i32,
        &fonts.small,
        &ctx.info.status_line,
    );

    let updated = format!("Updated {}", ctx.info.updated_display);
    drawing::text(
        ctx.image,
        ctx.palette.muted,
        (ctx.x + ctx.width) as i32 - 160,
        ctx.y as i32,
        &fonts.small,
        &updated,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::history::HistoryPoint;
    use chrono::TimeZone;
    use image::Rgba;

    fn count_pixels(image: &RgbaImage, colour: Rgba<u8>) -> usize {
        image.pixels().filter(|p| **p == colour).count()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 12, minute, 0).unwrap()
    }

    fn sample_window() -> TempWindow {
        let mut window = TempWindow::new(120);
        window.merge(&[
            HistoryPoint {
                probe: 0,
                timestamp: at(0),
                temperature: 90.0,
            },
            HistoryPoint {
                probe: 0,
                timestamp: at(10),
                temperature: 100.0,
            },
            HistoryPoint {
                probe: 1,
                timestamp: at(5),
                temperature: 60.0,
            },
            HistoryPoint {
                probe: 1,
                timestamp: at(10),
                temperature: 65.0,
            },
        ]);
        window
    }

    #[test]
    fn test_chart_draws_each_probe_series() {
        let info = DashboardInfo {
            target: Some(110.0),
            ..Default::default()
        };
        let window = sample_window();
        let palette = Palette::default();
        let mut image = RgbaImage::new(300, 150);

        let mut ctx = RenderContext {
            info: &info,
            window: &window,
            image: &mut image,
            fonts: None,
            palette: &palette,
            x: 0,
            y: 0,
            width: 300,
            height: 150,
        };
        render_chart(&mut ctx);

        assert!(count_pixels(&image, palette.probe_colour(0)) > 0);
        assert!(count_pixels(&image, palette.probe_colour(1)) > 0);
        assert!(count_pixels(&image, palette.target) > 0);
    }

    #[test]
    fn test_chart_handles_empty_window() {
        let info = DashboardInfo::default();
        let window = TempWindow::new(120);
        let palette = Palette::default();
        let mut image = RgbaImage::new(200, 100);

        let mut ctx = RenderContext {
            info: &info,
            window: &window,
            image: &mut image,
            fonts: None,
            palette: &palette,
            x: 0,
            y: 0,
            width: 200,
            height: 100,
        };
        render_chart(&mut ctx);

        // only the axis frame is drawn
        assert!(count_pixels(&image, palette.grid) > 0);
    }

    #[test]
    fn test_status_panel_draws_fan_bar() {
        let info = DashboardInfo {
            fan_on: Some(true),
            fan_speed: Some(50.0),
            ..Default::default()
        };
        let window = TempWindow::new(120);
        let palette = Palette::default();
        let mut image = RgbaImage::new(260, 300);

        let mut ctx = RenderContext {
            info: &info,
            window: &window,
            image: &mut image,
            fonts: None,
            palette: &palette,
            x: 0,
            y: 0,
            width: 260,
            height: 300,
        };
        render_status_panel(&mut ctx);

        assert!(count_pixels(&image, palette.fan) > 0);
    }

    #[test]
    fn test_status_panel_swatches_without_fonts() {
        let info = DashboardInfo::default();
        let window = sample_window();
        let palette = Palette::default();
        let mut image = RgbaImage::new(260, 300);

        let mut ctx = RenderContext {
            info: &info,
            window: &window,
            image: &mut image,
            fonts: None,
            palette: &palette,
            x: 0,
            y: 0,
            width: 260,
            height: 300,
        };
        render_status_panel(&mut ctx);

        assert!(count_pixels(&image, palette.probe_colour(0)) >= 100);
        assert!(count_pixels(&image, palette.probe_colour(1)) >= 100);
    }
}
