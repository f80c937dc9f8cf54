use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use nalgebra::Point2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    Fill,
    Stroke,
}

/// Color and stroke settings for a single drawing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Rgba<u8>,
    pub stroke_width: f32,
    pub style: PaintStyle,
}

impl Paint {
    pub const fn new(color: Rgba<u8>, stroke_width: f32, style: PaintStyle) -> Self {
        Self {
            color,
            stroke_width,
            style,
        }
    }
}

/// Drawing primitives the overlay graphics render with. Coordinates are in
/// surface space.
pub trait Canvas {
    fn draw_circle(&mut self, center: Point2<f32>, radius: f32, paint: &Paint);
    fn draw_line(&mut self, start: Point2<f32>, end: Point2<f32>, paint: &Paint);
}

/// Rasterises onto an RGBA image. Anything outside the image is clipped.
pub struct ImageCanvas<'a> {
    image: &'a mut RgbaImage,
}

impl<'a> ImageCanvas<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl Canvas for ImageCanvas<'_> {
    fn draw_circle(&mut self, center: Point2<f32>, radius: f32, paint: &Paint) {
        let c = (center.x.round() as i32, center.y.round() as i32);
        let r = radius.round().max(1.0) as i32;

        match paint.style {
            PaintStyle::Fill => draw_filled_circle_mut(self.image, c, r, paint.color),
            PaintStyle::Stroke => {
                // approximate the stroke width with concentric rings
                let rings = paint.stroke_width.round().max(1.0) as i32;
                for i in 0..rings {
                    let ring = r - rings / 2 + i;
                    if ring > 0 {
                        draw_hollow_circle_mut(self.image, c, ring, paint.color);
                    }
                }
            }
        }
    }

    fn draw_line(&mut self, start: Point2<f32>, end: Point2<f32>, paint: &Paint) {
        let direction = end - start;
        let length = direction.norm();
        let half_width = paint.stroke_width / 2.0;

        if length < f32::EPSILON {
            // zero length segment, draw a dot the size of the stroke
            let dot = Paint::new(paint.color, paint.stroke_width, PaintStyle::Fill);
            self.draw_circle(start, half_width, &dot);
            return;
        }

        if paint.stroke_width <= 1.0 {
            draw_line_segment_mut(self.image, (start.x, start.y), (end.x, end.y), paint.color);
            return;
        }

        // thick line as a quad around the segment
        let normal = nalgebra::Vector2::new(-direction.y, direction.x) / length * half_width;
        let corners = [start + normal, end + normal, end - normal, start - normal];
        let poly: Vec<Point<i32>> = corners
            .iter()
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();

        // imageproc rejects polygons whose first and last points coincide
        if poly[0] == poly[poly.len() - 1] {
            draw_line_segment_mut(self.image, (start.x, start.y), (end.x, end.y), paint.color);
        } else {
            draw_polygon_mut(self.image, &poly, paint.color);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Shape {
        Circle(Point2<f32>, f32, Paint),
        Line(Point2<f32>, Point2<f32>, Paint),
    }

    /// Canvas that remembers what was drawn on it.
    #[derive(Default)]
    pub(crate) struct RecordingCanvas {
        pub(crate) shapes: Vec<Shape>,
    }

    impl RecordingCanvas {
        pub(crate) fn circles(&self) -> Vec<Point2<f32>> {
            self.shapes
                .iter()
                .filter_map(|s| match s {
                    Shape::Circle(c, _, _) => Some(*c),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn lines(&self) -> Vec<(Point2<f32>, Point2<f32>)> {
            self.shapes
                .iter()
                .filter_map(|s| match s {
                    Shape::Line(a, b, _) => Some((*a, *b)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn draw_circle(&mut self, center: Point2<f32>, radius: f32, paint: &Paint) {
            self.shapes.push(Shape::Circle(center, radius, *paint));
        }

        fn draw_line(&mut self, start: Point2<f32>, end: Point2<f32>, paint: &Paint) {
            self.shapes.push(Shape::Line(start, end, *paint));
        }
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn filled_circle_covers_center() {
        let mut image = RgbaImage::from_pixel(50, 50, CLEAR);
        let mut canvas = ImageCanvas::new(&mut image);
        canvas.draw_circle(Point2::new(25.0, 25.0), 5.0, &Paint::new(RED, 1.0, PaintStyle::Fill));

        assert_eq!(*image.get_pixel(25, 25), RED);
        assert_eq!(*image.get_pixel(28, 25), RED);
        assert_eq!(*image.get_pixel(0, 0), CLEAR);
    }

    #[test]
    fn hollow_circle_leaves_center_empty() {
        let mut image = RgbaImage::from_pixel(50, 50, CLEAR);
        let mut canvas = ImageCanvas::new(&mut image);
        canvas.draw_circle(
            Point2::new(25.0, 25.0),
            10.0,
            &Paint::new(RED, 1.0, PaintStyle::Stroke),
        );

        assert_eq!(*image.get_pixel(25, 25), CLEAR);
        assert_eq!(*image.get_pixel(35, 25), RED);
    }

    #[test]
    fn thick_line_has_width() {
        let mut image = RgbaImage::from_pixel(50, 50, CLEAR);
        let mut canvas = ImageCanvas::new(&mut image);
        canvas.draw_line(
            Point2::new(5.0, 25.0),
            Point2::new(45.0, 25.0),
            &Paint::new(RED, 8.0, PaintStyle::Stroke),
        );

        assert_eq!(*image.get_pixel(25, 25), RED);
        assert_eq!(*image.get_pixel(25, 22), RED);
        assert_eq!(*image.get_pixel(25, 28), RED);
        assert_eq!(*image.get_pixel(25, 10), CLEAR);
    }

    #[test]
    fn degenerate_line_draws_a_dot() {
        let mut image = RgbaImage::from_pixel(20, 20, CLEAR);
        let mut canvas = ImageCanvas::new(&mut image);
        let p = Point2::new(10.0, 10.0);
        canvas.draw_line(p, p, &Paint::new(RED, 6.0, PaintStyle::Stroke));

        assert_eq!(*image.get_pixel(10, 10), RED);
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut image = RgbaImage::from_pixel(10, 10, CLEAR);
        let mut canvas = ImageCanvas::new(&mut image);
        canvas.draw_circle(Point2::new(-50.0, -50.0), 5.0, &Paint::new(RED, 1.0, PaintStyle::Fill));
        canvas.draw_line(
            Point2::new(-20.0, 5.0),
            Point2::new(30.0, 5.0),
            &Paint::new(RED, 4.0, PaintStyle::Stroke),
        );

        assert_eq!(*image.get_pixel(0, 0), CLEAR);
        assert_eq!(*image.get_pixel(5, 5), RED);
    }
}
