use tiny_skia::{Paint, PixmapMut, Rect, Transform};
use tracing::warn;

use super::color::Color;

/// A rectangle in physical pixels used to bound text drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ClipRect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x.saturating_add(self.width)
            && y >= self.y
            && y < self.y.saturating_add(self.height)
    }
}

/// Drawing context over one surface's pixel memory. Coordinates given to
/// the drawing calls are logical; the output scale is applied here.
///
/// While drawing, pixels are premultiplied RGBA. [`Canvas::finish`] converts
/// the frame to the compositor's little-endian ARGB8888.
pub struct Canvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    scale: i32,
}

impl<'a> Canvas<'a> {
    /// `width` and `height` are physical. Returns `None` if `data` is too
    /// small to hold them.
    pub fn new(data: &'a mut [u8], width: u32, height: u32, scale: i32) -> Option<Self> {
        let len = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        if data.len() < len {
            warn!(len = data.len(), width, height, "surface memory too small");
            return None;
        }
        Some(Canvas {
            data: &mut data[..len],
            width,
            height,
            scale: scale.max(1),
        })
    }

    pub fn scale(&self) -> i32 { self.scale }

    /// Replaces every pixel, alpha included.
    pub fn clear(&mut self, color: Color) {
        let pixel = color.premultiplied();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) else {
            return;
        };
        let Some(mut pixmap) = PixmapMut::from_bytes(self.data, self.width, self.height) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = false;
        let scale = self.scale as f32;
        pixmap.fill_rect(rect, &paint, Transform::from_scale(scale, scale), None);
    }

    /// The physical clip for a logical rectangle.
    pub fn clip(&self, x: i32, y: i32, width: i32, height: i32) -> ClipRect {
        ClipRect {
            x: x.saturating_mul(self.scale),
            y: y.saturating_mul(self.scale),
            width: width.saturating_mul(self.scale),
            height: height.saturating_mul(self.scale),
        }
    }

    /// Source-over blends `color` through an 8-bit coverage mask whose top-left
    /// corner lands at physical `(x, y)`.
    pub fn blend_coverage(
        &mut self,
        x: i32,
        y: i32,
        mask_width: usize,
        coverage: &[u8],
        clip: ClipRect,
        color: Color,
    ) {
        if mask_width == 0 {
            return;
        }
        let [r, g, b, a] = color.channels();
        for (i, &cov) in coverage.iter().enumerate() {
            if cov == 0 {
                continue;
            }
            let px = x + (i % mask_width) as i32;
            let py = y + (i / mask_width) as i32;
            if px < 0 || py < 0 || px >= self.width as i32 || py >= self.height as i32 {
                continue;
            }
            if !clip.contains(px, py) {
                continue;
            }
            let alpha = u32::from(cov) * u32::from(a) / 255;
            let inv = 255 - alpha;
            let offset = (py as usize * self.width as usize + px as usize) * 4;
            let dst = &mut self.data[offset..offset + 4];
            for (d, s) in dst.iter_mut().zip([r, g, b, 255]) {
                *d = ((u32::from(s) * alpha + u32::from(*d) * inv) / 255) as u8;
            }
        }
    }

    /// Swaps red and blue so the bytes read as ARGB8888 on little-endian.
    pub fn finish(self) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.swap(0, 2);
        }
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        let mut out = [0; 4];
        out.copy_from_slice(&self.data[offset..offset + 4]);
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const GREY: Color = Color::from_rgba(0x323232FF);
    const BLUE: Color = Color::from_rgba(0x5A8AC6FF);

    #[test]
    fn rejects_short_memory() {
        let mut data = vec![0; 15];
        assert!(Canvas::new(&mut data, 2, 2, 1).is_none());
    }

    #[test]
    fn clear_replaces_every_pixel() {
        let mut data = vec![0xAA; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut data, 4, 4, 1).unwrap();
        canvas.clear(Color::from_rgba(0x00000000));
        assert_eq!(canvas.pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn fill_rect_applies_scale() {
        let mut data = vec![0; 8 * 8 * 4];
        let mut canvas = Canvas::new(&mut data, 8, 8, 2).unwrap();
        canvas.clear(GREY);
        canvas.fill_rect(1, 1, 2, 2, BLUE);

        assert_eq!(canvas.pixel(1, 1), GREY.premultiplied());
        assert_eq!(canvas.pixel(2, 2), BLUE.premultiplied());
        assert_eq!(canvas.pixel(5, 5), BLUE.premultiplied());
        assert_eq!(canvas.pixel(6, 6), GREY.premultiplied());
    }

    #[test]
    fn coverage_respects_clip() {
        let mut data = vec![0; 4 * 1 * 4];
        let mut canvas = Canvas::new(&mut data, 4, 1, 1).unwrap();
        canvas.clear(Color::from_rgba(0x000000FF));
        let clip = canvas.clip(1, 0, 2, 1);
        canvas.blend_coverage(0, 0, 4, &[255; 4], clip, Color::from_rgba(0xFFFFFFFF));

        assert_eq!(canvas.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(1, 0), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(2, 0), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(3, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn clip_saturates_instead_of_overflowing() {
        let mut data = vec![0; 4];
        let canvas = Canvas::new(&mut data, 1, 1, 8).unwrap();
        let clip = canvas.clip(i32::MAX / 2, 0, i32::MAX, 1);
        assert_eq!(clip, ClipRect { x: i32::MAX, y: 0, width: i32::MAX, height: 8 });
        assert!(!clip.contains(0, 0));
        assert!(!clip.contains(i32::MAX - 1, 4));
    }

    #[test]
    fn finish_swaps_to_argb_byte_order() {
        let mut data = vec![0; 4];
        let mut canvas = Canvas::new(&mut data, 1, 1, 1).unwrap();
        canvas.clear(Color::from_rgba(0x112233FF));
        canvas.finish();
        assert_eq!(data, [0x33, 0x22, 0x11, 0xFF]);
    }
}
