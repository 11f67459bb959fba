/// Software rasterizer over a row-major RGB pixel buffer
use crate::entity::Rgb;

/// Twice-area threshold below which a triangle is drawn as a line
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Point blocks cover offsets `POINT_MIN..POINT_MAX` on both axes
const POINT_MIN: i32 = -2;
const POINT_MAX: i32 = 4;

pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks_exact(self.width.max(1))
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Reallocate for a new size, clearing to black
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels = vec![Rgb::BLACK; width * height];
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Write one pixel; coordinates off the buffer are ignored
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Fill a triangle given in pixel coordinates, interpolating vertex
    /// colors. Edges are inclusive.
    ///
    /// A triangle with (near) zero area is drawn as a vertical line at the
    /// first vertex's x, spanning the vertices' y range, in the first color.
    pub fn draw_triangle_color(
        &mut self,
        v0: (f32, f32),
        v1: (f32, f32),
        v2: (f32, f32),
        c0: Rgb,
        c1: Rgb,
        c2: Rgb,
    ) {
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);
        if denom.abs() < DEGENERATE_EPSILON {
            self.draw_vertical_line(v0.0.round() as i32, min_y, max_y, c0);
            return;
        }

        // Bounding box clipped to the buffer
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (w0, w1, w2) = barycentric(v0, v1, v2, denom, (x as f32, y as f32));
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    self.set_pixel(x, y, blend(w0, w1, w2, c0, c1, c2));
                }
            }
        }
    }

    fn draw_vertical_line(&mut self, x: i32, y0: i32, y1: i32, color: Rgb) {
        for y in y0.max(0)..=y1.min(self.height as i32 - 1) {
            self.set_pixel(x, y, color);
        }
    }

    /// Draw a point as a small filled block so it stays visible at low
    /// resolution
    pub fn draw_point(&mut self, p: (f32, f32), color: Rgb) {
        let (cx, cy) = (p.0.round() as i32, p.1.round() as i32);
        for dy in POINT_MIN..POINT_MAX {
            for dx in POINT_MIN..POINT_MAX {
                self.set_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Barycentric weights of `p`, given the precomputed twice-signed-area `denom`
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    denom: f32,
    p: (f32, f32),
) -> (f32, f32, f32) {
    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;
    (w0, w1, w2)
}

fn blend(w0: f32, w1: f32, w2: f32, c0: Rgb, c1: Rgb, c2: Rgb) -> Rgb {
    let mix = |a: u8, b: u8, c: u8| {
        (w0 * a as f32 + w1 * b as f32 + w2 * c as f32)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgb::new(mix(c0.r, c1.r, c2.r), mix(c0.g, c1.g, c2.g), mix(c0.b, c1.b, c2.b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pixel_out_of_bounds_is_noop() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.set_pixel(-1, 0, Rgb::RED);
        fb.set_pixel(0, -1, Rgb::RED);
        fb.set_pixel(4, 0, Rgb::RED);
        fb.set_pixel(0, 3, Rgb::RED);
        fb.set_pixel(i32::MAX, i32::MIN, Rgb::RED);
        assert!(fb.pixels().iter().all(|&p| p == Rgb::BLACK));

        fb.set_pixel(3, 2, Rgb::RED);
        assert_eq!(fb.pixel(3, 2), Some(Rgb::RED));
        assert_eq!(fb.pixel(4, 2), None);
    }

    #[test]
    fn test_triangle_color_interpolation() {
        let mut fb = FrameBuffer::new(16, 16);
        fb.draw_triangle_color(
            (0.0, 0.0),
            (10.0, 0.0),
            (0.0, 10.0),
            Rgb::RED,
            Rgb::GREEN,
            Rgb::BLUE,
        );

        assert_eq!(fb.pixel(0, 0), Some(Rgb::RED));

        let centroid = fb.pixel(3, 3).unwrap();
        // weights are (0.4, 0.3, 0.3)
        assert_eq!(centroid.r, 102);
        assert!((76..=77).contains(&centroid.g));
        assert!((76..=77).contains(&centroid.b));

        // inclusive edges
        assert_eq!(fb.pixel(10, 0), Some(Rgb::GREEN));
        assert_eq!(fb.pixel(0, 10), Some(Rgb::BLUE));
        assert_eq!(fb.pixel(5, 5), Some(Rgb::new(0, 128, 128)));
        // outside the hypotenuse
        assert_eq!(fb.pixel(6, 6), Some(Rgb::BLACK));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut a = FrameBuffer::new(12, 12);
        let mut b = FrameBuffer::new(12, 12);
        a.draw_triangle_color((1.0, 1.0), (9.0, 2.0), (4.0, 9.0), Rgb::WHITE, Rgb::WHITE, Rgb::WHITE);
        b.draw_triangle_color((1.0, 1.0), (4.0, 9.0), (9.0, 2.0), Rgb::WHITE, Rgb::WHITE, Rgb::WHITE);
        assert_eq!(a.pixels(), b.pixels());
        assert!(a.pixels().iter().any(|&p| p == Rgb::WHITE));
    }

    #[test]
    fn test_degenerate_triangle_draws_line() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.draw_triangle_color((2.4, 1.0), (2.4, 5.0), (2.4, 3.0), Rgb::RED, Rgb::GREEN, Rgb::BLUE);
        for y in 0..10 {
            let expected = if (1..=5).contains(&y) { Rgb::RED } else { Rgb::BLACK };
            assert_eq!(fb.pixel(2, y), Some(expected));
        }
        assert_eq!(fb.pixels().iter().filter(|&&p| p != Rgb::BLACK).count(), 5);
    }

    #[test]
    fn test_offscreen_triangle_is_clipped() {
        let mut fb = FrameBuffer::new(8, 8);
        fb.draw_triangle_color((-50.0, -50.0), (100.0, -50.0), (-50.0, 100.0), Rgb::RED, Rgb::RED, Rgb::RED);
        assert!(fb.pixels().iter().all(|&p| p == Rgb::RED));
    }

    #[test]
    fn test_point_block() {
        let mut fb = FrameBuffer::new(20, 20);
        fb.draw_point((10.0, 10.0), Rgb::GREEN);
        assert_eq!(fb.pixels().iter().filter(|&&p| p == Rgb::GREEN).count(), 36);
        assert_eq!(fb.pixel(8, 8), Some(Rgb::GREEN));
        assert_eq!(fb.pixel(13, 13), Some(Rgb::GREEN));
        assert_eq!(fb.pixel(7, 10), Some(Rgb::BLACK));
        assert_eq!(fb.pixel(14, 10), Some(Rgb::BLACK));

        // partially off the edge
        fb.draw_point((0.0, 0.0), Rgb::BLUE);
        assert_eq!(fb.pixel(0, 0), Some(Rgb::BLUE));
    }

    #[test]
    fn test_clear_and_resize() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(Rgb::WHITE);
        assert!(fb.pixels().iter().all(|&p| p == Rgb::WHITE));
        assert_eq!(fb.rows().count(), 2);

        fb.resize(3, 1);
        assert_eq!(fb.pixels().len(), 3);
        assert_eq!(fb.pixel(2, 0), Some(Rgb::BLACK));
    }
}
