use crate::renderer::fonts::FontConfig;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;

pub fn fill_background(image: &mut RgbaImage, colour: Rgba<u8>) {
    for pixel in image.pixels_mut() {
        *pixel = colour;
    }
}

pub fn horizontal_line(image: &mut RgbaImage, x: u32, y: u32, width: u32, colour: Rgba<u8>) {
    draw_line_segment_mut(
        image,
        (x as f32, y as f32),
        ((x + width) as f32, y as f32),
        colour,
    );
}

pub fn vertical_line(image: &mut RgbaImage, x: u32, y1: u32, y2: u32, colour: Rgba<u8>) {
    draw_line_segment_mut(image, (x as f32, y1 as f32), (x as f32, y2 as f32), colour);
}

pub fn dashed_horizontal_line(
    image: &mut RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    dash: u32,
    colour: Rgba<u8>,
) {
    let dash = dash.max(1);
    let mut cursor = x;
    let end = x + width;
    while cursor < end {
        let segment_end = (cursor + dash).min(end);
        draw_line_segment_mut(
            image,
            (cursor as f32, y as f32),
            (segment_end as f32, y as f32),
            colour,
        );
        cursor = segment_end + dash;
    }
}

/// Connect consecutive points with line segments.
pub fn polyline(image: &mut RgbaImage, points: &[(f32, f32)], colour: Rgba<u8>) {
    for pair in points.windows(2) {
        draw_line_segment_mut(image, pair[0], pair[1], colour);
    }
}

pub fn text(
    image: &mut RgbaImage,
    colour: Rgba<u8>,
    x: i32,
    y: i32,
    font_config: &FontConfig,
    content: &str,
) {
    draw_text_mut(image, colour, x, y, font_config.scale, &font_config.font, content);
}

pub fn filled_rect(
    image: &mut RgbaImage,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    colour: Rgba<u8>,
) {
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, height), colour);
}

pub fn progress_bar(
    image: &mut RgbaImage,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    fraction: f32,
    colour: Rgba<u8>,
) {
    let bg_colour = Rgba([30, 30, 30, 255]);

    // Background
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, height), bg_colour);

    // Fill
    let bar_width = (fraction.clamp(0.0, 1.0) * width as f32) as u32;
    if bar_width > 0 {
        draw_filled_rect_mut(image, Rect::at(x, y).of_size(bar_width, height), colour);
    }

    // Border
    draw_hollow_rect_mut(
        image,
        Rect::at(x, y).of_size(width, height),
        Rgba([100, 100, 100, 255]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> RgbaImage {
        let mut image = RgbaImage::new(width, height);
        fill_background(&mut image, Rgba([0, 0, 0, 255]));
        image
    }

    #[test]
    fn test_horizontal_line_spans_requested_width() {
        let mut image = blank(20, 10);
        let red = Rgba([255, 0, 0, 255]);
        horizontal_line(&mut image, 2, 5, 10, red);
        assert_eq!(*image.get_pixel(2, 5), red);
        assert_eq!(*image.get_pixel(11, 5), red);
        assert_eq!(*image.get_pixel(1, 5), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_dashed_line_has_gaps() {
        let mut image = blank(40, 4);
        let green = Rgba([0, 255, 0, 255]);
        dashed_horizontal_line(&mut image, 0, 2, 40, 4, green);
        assert_eq!(*image.get_pixel(0, 2), green);
        // middle of the first gap
        assert_eq!(*image.get_pixel(6, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_progress_bar_fill_fraction() {
        let mut image = blank(100, 12);
        let cyan = Rgba([0, 188, 212, 255]);
        progress_bar(&mut image, 0, 0, 100, 12, 0.5, cyan);
        assert_eq!(*image.get_pixel(25, 6), cyan);
        assert_eq!(*image.get_pixel(75, 6), Rgba([30, 30, 30, 255]));
    }

    #[test]
    fn test_progress_bar_clamps_overrange() {
        let mut image = blank(50, 8);
        let cyan = Rgba([0, 188, 212, 255]);
        progress_bar(&mut image, 0, 0, 50, 8, 1.7, cyan);
        assert_eq!(*image.get_pixel(48, 4), cyan);
    }

    #[test]
    fn test_polyline_connects_points() {
        let mut image = blank(20, 20);
        let white = Rgba([255, 255, 255, 255]);
        polyline(&mut image, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], white);
        assert_eq!(*image.get_pixel(5, 0), white);
        assert_eq!(*image.get_pixel(10, 5), white);
    }
}
