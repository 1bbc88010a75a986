//! CPU compositing canvas the view draws into. Hosts upload the finished
//! frame as a texture (or blit it) once per redraw.

use image::{Rgba, RgbaImage};

pub const HANDLE_COLOR: Rgba<u8> = Rgba([60, 120, 255, 255]);
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const PLACEHOLDER: Rgba<u8> = Rgba([24, 24, 28, 255]);

#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        for px in self.image.pixels_mut() {
            *px = color;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Raw RGBA8 bytes, row-major, for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Source-over blit of `src` at the canvas origin. Pixels beyond the
    /// canvas bounds are clipped.
    pub fn composite(&mut self, src: &RgbaImage) {
        let w = src.width().min(self.image.width());
        let h = src.height().min(self.image.height());
        for y in 0..h {
            for x in 0..w {
                let s = src.get_pixel(x, y).0;
                over(self.image.get_pixel_mut(x, y), s);
            }
        }
    }

    /// Filled circle for a corner handle marker.
    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
        let r2 = radius * radius;
        let x0 = (cx - radius).floor().max(0.0) as u32;
        let y0 = (cy - radius).floor().max(0.0) as u32;
        let x1 = ((cx + radius).ceil() as i64).clamp(0, i64::from(self.image.width())) as u32;
        let y1 = ((cy + radius).ceil() as i64).clamp(0, i64::from(self.image.height())) as u32;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }
}

fn over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as f64 / 255.0;
    if sa >= 1.0 {
        dst.0 = src;
        return;
    }
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src[c] as f64 * sa;
        let d = dst.0[c] as f64 * da * (1.0 - sa);
        dst.0[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_respects_transparency() {
        let mut canvas = Canvas::new(4, 4);
        canvas.clear(Rgba([10, 10, 10, 255]));
        let mut overlay = RgbaImage::new(4, 4);
        overlay.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        canvas.composite(&overlay);
        assert_eq!(canvas.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(0, 0).0, [10, 10, 10, 255]);
    }

    #[test]
    fn circle_is_clipped_at_the_edges() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle(0.0, 0.0, 3.0, HANDLE_COLOR);
        assert_eq!(canvas.image().get_pixel(0, 0).0, HANDLE_COLOR.0);
        assert_eq!(canvas.image().get_pixel(7, 7).0, BACKGROUND.0);
    }

    #[test]
    fn zero_sized_canvas_is_clamped() {
        let canvas = Canvas::new(0, 0);
        assert_eq!((canvas.width(), canvas.height()), (1, 1));
    }
}
