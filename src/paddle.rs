use bevy::prelude::*;

use crate::ball::{Ball, Magnetic};
use crate::layout::{Boundary, Hitbox};
use crate::level::{self, DemoMode};
use crate::AppState;

pub const PADDLE_SPEED: f32 = 500.0;
pub const PADDLE_HEIGHT: f32 = 20.0;

pub struct PaddlePlugin;

impl Plugin for PaddlePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                move_paddle.run_if(level::gameplay_running.and(not(resource_exists::<DemoMode>))),
                follow_lead_ball.run_if(level::gameplay_running.and(resource_exists::<DemoMode>)),
            )
                .run_if(in_state(AppState::Playing)),
        );
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PaddleSize {
    Short,
    Normal,
    Long,
}

impl PaddleSize {
    pub fn width(self) -> f32 {
        match self {
            PaddleSize::Short => 100.0,
            PaddleSize::Normal => 150.0,
            PaddleSize::Long => 200.0,
        }
    }

    pub fn image(self) -> &'static str {
        match self {
            PaddleSize::Short => "images/paddles/short_paddle.png",
            PaddleSize::Normal => "images/paddles/normal_paddle.png",
            PaddleSize::Long => "images/paddles/long_paddle.png",
        }
    }

    /// Short becomes normal, anything else becomes long.
    pub fn grown(self) -> PaddleSize {
        match self {
            PaddleSize::Short => PaddleSize::Normal,
            _ => PaddleSize::Long,
        }
    }

    /// Long becomes normal, anything else becomes short.
    pub fn shrunk(self) -> PaddleSize {
        match self {
            PaddleSize::Long => PaddleSize::Normal,
            _ => PaddleSize::Short,
        }
    }
}

/// The player's paddle and its power state. Powers persist through size
/// changes and are lost when a life is lost.
#[derive(Component)]
pub struct Paddle {
    pub size: PaddleSize,
    pub magnetic: bool,
    pub shooter: bool,
    pub invincible_charges: u32,
    pub split_charges: u32,
}

impl Paddle {
    pub fn new() -> Self {
        Paddle {
            size: PaddleSize::Normal,
            magnetic: false,
            shooter: false,
            invincible_charges: 0,
            split_charges: 0,
        }
    }
}

pub fn spawn_paddle(
    commands: &mut Commands,
    asset_server: &AssetServer,
    boundary: &Boundary,
) -> Entity {
    let size = PaddleSize::Normal;
    commands
        .spawn((
            Sprite {
                image: asset_server.load(size.image()),
                custom_size: Some(Vec2::new(size.width(), PADDLE_HEIGHT)),
                ..default()
            },
            Transform::from_xyz(boundary.center_x(), boundary.inner_bottom + 20.0, 2.0),
            Hitbox(Vec2::new(size.width(), PADDLE_HEIGHT)),
            Paddle::new(),
            level::LevelEntity,
        ))
        .id()
}

/// Swaps the paddle art and hitbox after a size change, keeping it inside
/// the field.
pub fn apply_size(
    size: PaddleSize,
    sprite: &mut Sprite,
    hitbox: &mut Hitbox,
    transform: &mut Transform,
    boundary: &Boundary,
    asset_server: &AssetServer,
) {
    sprite.image = asset_server.load(size.image());
    sprite.custom_size = Some(Vec2::new(size.width(), PADDLE_HEIGHT));
    hitbox.0 = Vec2::new(size.width(), PADDLE_HEIGHT);

    let half = size.width() / 2.0;
    transform.translation.x = transform
        .translation
        .x
        .clamp(boundary.inner_left + half, boundary.inner_right - half);
}

/// Arrow-key movement, clamped to the field. Magnetic balls ride along by
/// exactly the distance the paddle actually moved.
fn move_paddle(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    boundary: Res<Boundary>,
    mut paddles: Query<(&Paddle, &mut Transform, &Hitbox), Without<Magnetic>>,
    mut riders: Query<&mut Transform, (With<Magnetic>, With<Ball>)>,
) {
    let Ok((_, mut transform, hitbox)) = paddles.single_mut() else {
        return;
    };

    let left = keys.pressed(KeyCode::ArrowLeft);
    let right = keys.pressed(KeyCode::ArrowRight);
    let direction = match (left, right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => return,
    };

    let half = hitbox.half().x;
    let before = transform.translation.x;
    let target = before + direction * PADDLE_SPEED * time.delta_secs();
    transform.translation.x = target.clamp(boundary.inner_left + half, boundary.inner_right - half);
    let moved = transform.translation.x - before;

    for mut rider in riders.iter_mut() {
        rider.translation.x += moved;
    }
}

/// Demo-mode autopilot: the paddle shadows the first ball.
fn follow_lead_ball(
    boundary: Res<Boundary>,
    balls: Query<&Transform, (With<Ball>, Without<Paddle>)>,
    mut paddles: Query<(&mut Transform, &Hitbox), With<Paddle>>,
) {
    let Ok((mut transform, hitbox)) = paddles.single_mut() else {
        return;
    };
    let Some(ball) = balls.iter().next() else {
        return;
    };

    let half = hitbox.half().x;
    transform.translation.x = ball
        .translation
        .x
        .clamp(boundary.inner_left + half, boundary.inner_right - half);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_step_between_neighbours() {
        assert_eq!(PaddleSize::Short.grown(), PaddleSize::Normal);
        assert_eq!(PaddleSize::Normal.grown(), PaddleSize::Long);
        assert_eq!(PaddleSize::Long.grown(), PaddleSize::Long);
        assert_eq!(PaddleSize::Long.shrunk(), PaddleSize::Normal);
        assert_eq!(PaddleSize::Normal.shrunk(), PaddleSize::Short);
        assert_eq!(PaddleSize::Short.shrunk(), PaddleSize::Short);
    }

    #[test]
    fn wider_sizes_are_wider() {
        assert!(PaddleSize::Short.width() < PaddleSize::Normal.width());
        assert!(PaddleSize::Normal.width() < PaddleSize::Long.width());
    }
}
