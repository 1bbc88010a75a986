//! Projective mapping from a source rectangle onto a movable destination quad.
//!
//! The mapping is a full homography, so non-parallelogram quads keep straight
//! lines straight while giving up parallelism. Stills are resampled once on the
//! CPU; live frames are composited through the same matrix at paint time.

use image::RgbaImage;

use crate::error::Error;

/// A 2-D point in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The four destination corners, fixed order: top-left, top-right,
/// bottom-right, bottom-left. Only positions ever change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Point; 4],
}

impl Quad {
    /// Reset to the bounding rectangle of a `w` x `h` view.
    pub fn from_rect(w: f64, h: f64) -> Self {
        Self {
            corners: [
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ],
        }
    }

    /// True if any three corners are (near-)collinear, which makes the
    /// perspective mapping undefined. Duplicate corners count as collinear.
    pub fn is_degenerate(&self) -> bool {
        let c = &self.corners;
        for i in 0..4 {
            for j in (i + 1)..4 {
                for k in (j + 1)..4 {
                    let ab = (c[j].x - c[i].x, c[j].y - c[i].y);
                    let ac = (c[k].x - c[i].x, c[k].y - c[i].y);
                    let cross = ab.0 * ac.1 - ab.1 * ac.0;
                    let scale = (ab.0 * ab.0 + ab.1 * ab.1).sqrt()
                        * (ac.0 * ac.0 + ac.1 * ac.1).sqrt();
                    if cross.abs() <= 1e-9 * scale.max(1.0) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Row-major 3x3 projective transform. Derived value only: recomputed whenever
/// the corner set or the view size changes, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    pub m: [[f64; 3]; 3],
}

impl Homography {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Solve for the homography taking the corners of a `src_w` x `src_h`
    /// rectangle onto `dst`, in the fixed corner order.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] when `dst` is degenerate, the source
    /// dimensions are not positive, or the linear system is singular.
    pub fn map_rect_to_quad(src_w: f64, src_h: f64, dst: &Quad) -> Result<Self, Error> {
        if src_w <= 0.0 || src_h <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "source rectangle {src_w}x{src_h} is empty"
            )));
        }
        if dst.is_degenerate() {
            return Err(Error::InvalidGeometry(
                "three destination corners are collinear".into(),
            ));
        }

        let src = [
            Point::new(0.0, 0.0),
            Point::new(src_w, 0.0),
            Point::new(src_w, src_h),
            Point::new(0.0, src_h),
        ];

        // Unknowns [a..h] with H = [[a,b,c],[d,e,f],[g,h,1]]. Each point pair
        // contributes two rows of the 8x8 system.
        let mut aug = [[0.0f64; 9]; 8];
        for (i, (s, d)) in src.iter().zip(dst.corners.iter()).enumerate() {
            let (x, y, u, v) = (s.x, s.y, d.x, d.y);
            aug[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
            aug[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
        }

        let h = solve_8x8(&mut aug)
            .ok_or_else(|| Error::InvalidGeometry("singular perspective system".into()))?;

        Ok(Self {
            m: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], 1.0],
            ],
        })
    }

    /// Forward-project a point through the transform.
    pub fn map_point(&self, p: Point) -> Point {
        let m = &self.m;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        let w = if w.abs() < 1e-12 { 1e-12 } else { w };
        Point::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        )
    }

    /// Invert via adjugate over determinant.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] if the matrix is singular.
    pub fn inverse(&self) -> Result<Self, Error> {
        let m = &self.m;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < 1e-12 {
            return Err(Error::InvalidGeometry("transform is not invertible".into()));
        }
        let inv_det = 1.0 / det;
        Ok(Self {
            m: [
                [
                    c00 * inv_det,
                    (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                    (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
                ],
                [
                    c01 * inv_det,
                    (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                    (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
                ],
                [
                    c02 * inv_det,
                    (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                    (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
                ],
            ],
        })
    }

    /// Row-major 3x3 as f32, for hosts that composite live frames on the GPU
    /// or a 2-D canvas instead of resampling on the CPU.
    pub fn as_draw_matrix(&self) -> [f32; 9] {
        let m = &self.m;
        [
            m[0][0] as f32,
            m[0][1] as f32,
            m[0][2] as f32,
            m[1][0] as f32,
            m[1][1] as f32,
            m[1][2] as f32,
            m[2][0] as f32,
            m[2][1] as f32,
            m[2][2] as f32,
        ]
    }
}

/// Gaussian elimination with partial pivoting over an 8x9 augmented system.
/// Returns `None` when a pivot collapses.
fn solve_8x8(aug: &mut [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot_row = (col..8).max_by(|&a, &b| {
            aug[a][col]
                .abs()
                .partial_cmp(&aug[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        aug.swap(col, pivot_row);
        for row in (col + 1)..8 {
            let factor = aug[row][col] / aug[col][col];
            for k in col..9 {
                aug[row][k] -= factor * aug[col][k];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut acc = aug[row][8];
        for k in (row + 1)..8 {
            acc -= aug[row][k] * x[k];
        }
        x[row] = acc / aug[row][row];
    }
    Some(x)
}

/// Resample `src` through `h` into a fresh `dst_w` x `dst_h` RGBA buffer.
/// Pixels outside the destination quad stay transparent. Used for stills,
/// where the result is cached until geometry or content changes.
///
/// # Errors
/// [`Error::InvalidGeometry`] if the transform cannot be inverted.
pub fn apply_to_buffer(
    h: &Homography,
    src: &RgbaImage,
    dst_w: u32,
    dst_h: u32,
) -> Result<RgbaImage, Error> {
    let mut out = RgbaImage::new(dst_w, dst_h);
    warp_over(h, src, &mut out)?;
    Ok(out)
}

/// Composite `src` through `h` directly over `dst` (source-over blending).
/// This is the draw-matrix path: live frames are warped as part of
/// compositing, with no intermediate per-frame buffer.
///
/// # Errors
/// [`Error::InvalidGeometry`] if the transform cannot be inverted.
pub fn warp_over(h: &Homography, src: &RgbaImage, dst: &mut RgbaImage) -> Result<(), Error> {
    let inv = h.inverse()?;
    let (src_w, src_h) = (src.width() as f64, src.height() as f64);
    let (dst_w, dst_h) = (dst.width(), dst.height());

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse-map the destination pixel center into source space.
            let p = inv.map_point(Point::new(dx as f64 + 0.5, dy as f64 + 0.5));
            if p.x < 0.0 || p.y < 0.0 || p.x > src_w || p.y > src_h {
                continue;
            }
            let sample = bilinear(src, p.x - 0.5, p.y - 0.5);
            blend_over(dst.get_pixel_mut(dx, dy), sample);
        }
    }
    Ok(())
}

fn bilinear(src: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let max_x = (src.width() - 1) as f64;
    let max_y = (src.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bot = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn blend_over(dst: &mut image::Rgba<u8>, src: [u8; 4]) {
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
    if out_a <= 0.0 {
        dst.0 = [0, 0, 0, 0];
        return;
    }
    for c in 0..3 {
        let s = src[c] as f64 * sa;
        let d = dst.0[c] as f64 * da * (1.0 - sa);
        dst.0[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}
