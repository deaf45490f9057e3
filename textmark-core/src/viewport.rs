//! Page-space to pixel-space projection.
//!
//! A [`Viewport`] is a snapshot: it is recomputed from the page's view box
//! whenever scale or rotation changes and never mutated afterwards.

use serde::Serialize;

/// `[x0, y0, x1, y1]` in page units (points), origin bottom-left.
pub type ViewBox = [f32; 4];

/// Affine transform `[a, b, c, d, e, f]` as used by page descriptions.
pub type Transform = [f32; 6];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub view_box: ViewBox,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub rotation: u32,
    pub transform: Transform,
}

pub fn normalize_rotation(rotation: i32) -> u32 {
    rotation.rem_euclid(360) as u32
}

impl Viewport {
    /// Rotations that are not a multiple of 90 snap down to the previous
    /// quarter turn.
    pub fn new(view_box: ViewBox, scale: f32, rotation: i32) -> Self {
        let rotation = normalize_rotation(rotation) / 90 * 90;
        let (a, b, c, d) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };

        let [x0, y0, x1, y1] = view_box;
        let center_x = (x0 + x1) / 2.0;
        let center_y = (y0 + y1) / 2.0;

        let (offset_x, offset_y, width, height) = if a == 0.0 {
            (
                (center_y - y0).abs() * scale,
                (center_x - x0).abs() * scale,
                (y1 - y0).abs() * scale,
                (x1 - x0).abs() * scale,
            )
        } else {
            (
                (center_x - x0).abs() * scale,
                (center_y - y0).abs() * scale,
                (x1 - x0).abs() * scale,
                (y1 - y0).abs() * scale,
            )
        };

        let transform = [
            a * scale,
            b * scale,
            c * scale,
            d * scale,
            offset_x - a * scale * center_x - c * scale * center_y,
            offset_y - b * scale * center_x - d * scale * center_y,
        ];

        Self {
            view_box,
            width,
            height,
            scale,
            rotation,
            transform,
        }
    }

    pub fn convert_to_viewport_point(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.transform;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Same page and rotation at a different scale.
    pub fn rescaled(&self, scale: f32) -> Self {
        Self::new(self.view_box, scale, self.rotation as i32)
    }

    /// Whole-pixel size, as used for the page box.
    pub fn floor_size(&self) -> (u32, u32) {
        (self.width.floor().max(0.0) as u32, self.height.floor().max(0.0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: ViewBox = [0.0, 0.0, 612.0, 792.0];

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn unrotated_viewport_flips_the_y_axis() {
        let viewport = Viewport::new(LETTER, 1.0, 0);
        assert_eq!((viewport.width, viewport.height), (612.0, 792.0));

        let (x, y) = viewport.convert_to_viewport_point(0.0, 0.0);
        assert!(approx(x, 0.0) && approx(y, 792.0));
        let (x, y) = viewport.convert_to_viewport_point(612.0, 792.0);
        assert!(approx(x, 612.0) && approx(y, 0.0));
    }

    #[test]
    fn doubling_scale_doubles_the_size() {
        let base = Viewport::new(LETTER, 1.0, 0);
        let zoomed = base.rescaled(2.0);
        assert_eq!(zoomed.width, base.width * 2.0);
        assert_eq!(zoomed.height, base.height * 2.0);
        assert_eq!(zoomed.scale, 2.0);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let viewport = Viewport::new(LETTER, 1.5, 90);
        assert!(approx(viewport.width, 792.0 * 1.5));
        assert!(approx(viewport.height, 612.0 * 1.5));

        // Page origin lands in the top-left corner after a clockwise turn.
        let (x, y) = viewport.convert_to_viewport_point(0.0, 0.0);
        assert!(approx(x, 0.0) && approx(y, 0.0));
    }

    #[test]
    fn half_turn_maps_origin_to_top_right() {
        let viewport = Viewport::new(LETTER, 1.0, 180);
        let (x, y) = viewport.convert_to_viewport_point(0.0, 0.0);
        assert!(approx(x, 612.0) && approx(y, 0.0));
    }

    #[test]
    fn rotation_is_normalized() {
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(Viewport::new(LETTER, 1.0, 720).rotation, 0);
        assert_eq!(Viewport::new(LETTER, 1.0, 100).rotation, 90);
    }
}
