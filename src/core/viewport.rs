//=========================================================================
// Viewport
//=========================================================================
//
// Visible world rectangle, centred on the origin.
//
//          top ┌───────────────┐
//              │       ·       │  height
//       bottom └───────────────┘
//            left    width    right
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec2;
use rand::Rng;

//=== Internal Dependencies ===============================================

use super::config::ViewportConfig;

//=== Viewport ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    half: Vec2,
}

impl Viewport {
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    pub fn new(width: f32, height: f32) -> Self {
        assert!(
            width > 0.0 && height > 0.0,
            "Viewport dimensions must be positive, got {}x{}",
            width,
            height
        );
        Self {
            half: Vec2::new(width, height) * 0.5,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(config.width, config.height)
    }

    //--- Dimensions -------------------------------------------------------

    pub fn width(&self) -> f32 {
        self.half.x * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half.y * 2.0
    }

    pub fn left(&self) -> f32 {
        -self.half.x
    }

    pub fn right(&self) -> f32 {
        self.half.x
    }

    pub fn bottom(&self) -> f32 {
        -self.half.y
    }

    pub fn top(&self) -> f32 {
        self.half.y
    }

    //--- Queries ----------------------------------------------------------

    /// True if `point` lies inside the rectangle, edges included.
    pub fn is_on_screen(&self, point: Vec2) -> bool {
        point.x.abs() <= self.half.x && point.y.abs() <= self.half.y
    }

    /// Per-axis off-screen flags: `(outside horizontally, outside vertically)`.
    pub fn off_screen_axes(&self, point: Vec2) -> (bool, bool) {
        (point.x.abs() > self.half.x, point.y.abs() > self.half.y)
    }

    /// Uniformly random point inside the rectangle.
    pub fn random_visible_position(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.gen_range(-self.half.x..=self.half.x),
            rng.gen_range(-self.half.y..=self.half.y),
        )
    }

    /// Offset of the neighbouring screen tile `columns` across and `rows` up.
    pub fn tile_offset(&self, columns: i32, rows: i32) -> Vec2 {
        Vec2::new(columns as f32 * self.width(), rows as f32 * self.height())
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&ViewportConfig::default())
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn edges_count_as_on_screen() {
        let view = Viewport::new(10.0, 6.0);
        assert!(view.is_on_screen(Vec2::new(5.0, -3.0)));
        assert!(!view.is_on_screen(Vec2::new(5.01, 0.0)));
        assert_eq!(view.off_screen_axes(Vec2::new(0.0, 4.0)), (false, true));
    }

    #[test]
    fn random_positions_stay_visible() {
        let view = Viewport::new(10.0, 6.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(view.is_on_screen(view.random_visible_position(&mut rng)));
        }
    }

    #[test]
    fn tile_offsets_span_whole_screens() {
        let view = Viewport::new(10.0, 6.0);
        assert_eq!(view.tile_offset(-1, 1), Vec2::new(-10.0, 6.0));
        assert_eq!(view.left(), -5.0);
        assert_eq!(view.top(), 3.0);
    }

    #[test]
    #[should_panic(expected = "Viewport dimensions must be positive")]
    fn zero_width_panics() {
        Viewport::new(0.0, 6.0);
    }
}
