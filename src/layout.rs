use bevy::prelude::*;

// The whole game is authored against this resolution. All boundary images
// and brick grids assume it; changing these would require redrawing the art.
pub const SCREEN_WIDTH: f32 = 1536.0;
pub const SCREEN_HEIGHT: f32 = 864.0;

pub const SCREEN_PADDING: f32 = 10.0;
pub const BOUNDARY_THICKNESS: f32 = 25.0;
pub const PLAYING_FIELD_WIDTH: f32 = 1080.0;
pub const BRICK_WIDTH: f32 = 75.0;
pub const BRICK_HEIGHT: f32 = 25.0;
pub const BRICK_MARGIN: f32 = 2.0;
pub const COLUMNS: usize = 14;

/// The inner edges of the current play area. Levels use the bricked-off
/// playing field on the left of the screen; menu screens use a boundary
/// spanning the whole screen whose bottom also reflects balls.
#[derive(Resource, Clone, Copy)]
pub struct Boundary {
    pub inner_left: f32,
    pub inner_right: f32,
    pub inner_bottom: f32,
    pub inner_top: f32,
    /// Menu screens bounce balls off the bottom edge instead of losing them.
    pub reflects_bottom: bool,
}

impl Boundary {
    pub fn playing_field() -> Self {
        let inner_left = SCREEN_PADDING + BOUNDARY_THICKNESS;
        Boundary {
            inner_left,
            inner_right: inner_left + PLAYING_FIELD_WIDTH,
            inner_bottom: inner_left,
            inner_top: SCREEN_HEIGHT - inner_left,
            reflects_bottom: false,
        }
    }

    pub fn fullscreen() -> Self {
        let inner_left = SCREEN_PADDING + BOUNDARY_THICKNESS;
        Boundary {
            inner_left,
            inner_right: SCREEN_WIDTH - inner_left,
            inner_bottom: inner_left,
            inner_top: SCREEN_HEIGHT - inner_left,
            reflects_bottom: true,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.inner_left + self.inner_right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        SCREEN_HEIGHT / 2.0
    }
}

/// Axis-aligned collision box, stored as the sprite's full size.
/// Every collidable entity carries one so collision code never has to
/// guess sizes from image data.
#[derive(Component, Clone, Copy)]
pub struct Hitbox(pub Vec2);

impl Hitbox {
    pub fn half(&self) -> Vec2 {
        self.0 / 2.0
    }
}

/// AABB overlap test on sprite centers and full sizes.
pub fn overlaps(a_center: Vec2, a_size: Vec2, b_center: Vec2, b_size: Vec2) -> bool {
    let a_half = a_size / 2.0;
    let b_half = b_size / 2.0;
    (a_center.x - b_center.x).abs() < a_half.x + b_half.x
        && (a_center.y - b_center.y).abs() < a_half.y + b_half.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playing_field_edges() {
        let b = Boundary::playing_field();
        assert_eq!(b.inner_left, 35.0);
        assert_eq!(b.inner_right, 1115.0);
        assert_eq!(b.inner_bottom, 35.0);
        assert_eq!(b.inner_top, 829.0);
        assert!(!b.reflects_bottom);
    }

    #[test]
    fn fullscreen_boundary_spans_screen() {
        let b = Boundary::fullscreen();
        assert_eq!(b.inner_right, SCREEN_WIDTH - 35.0);
        assert_eq!(b.center_x(), SCREEN_WIDTH / 2.0);
        assert!(b.reflects_bottom);
    }

    #[test]
    fn overlap_detects_touching_and_separated_boxes() {
        let brick = Vec2::new(BRICK_WIDTH, BRICK_HEIGHT);
        let ball = Vec2::splat(18.0);
        assert!(overlaps(
            Vec2::new(100.0, 100.0),
            brick,
            Vec2::new(140.0, 110.0),
            ball
        ));
        assert!(!overlaps(
            Vec2::new(100.0, 100.0),
            brick,
            Vec2::new(100.0, 200.0),
            ball
        ));
    }
}
