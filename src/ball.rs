use bevy::prelude::*;
use rand::Rng;

use crate::audio::{play_sfx, GameAudio};
use crate::brick::{Brick, DamageBrick};
use crate::layout::{overlaps, Boundary, Hitbox};
use crate::level::{self, LevelEntity};
use crate::paddle::Paddle;
use crate::transitions::CameraTransition;
use crate::AppState;

pub const BALL_MIN_SPEED: f32 = 550.0;
pub const BALL_MAX_SPEED: f32 = BALL_MIN_SPEED + 300.0;
pub const BALL_SIZE: f32 = 18.0;
pub const SPEED_STEP: f32 = 50.0;

pub const NORMAL_BALL_IMAGE: &str = "images/balls/normal_ball.png";
pub const INVINCIBLE_BALL_IMAGE: &str = "images/balls/invincible_ball.png";

/// Decorative balls bouncing behind the menu screens.
const RANDOM_BALLS: usize = 10;

pub struct BallPlugin;

impl Plugin for BallPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_ball_landed);
        app.add_observer(on_release_balls);
        app.add_systems(
            Update,
            (
                move_balls.run_if(in_state(AppState::Playing).and(level::gameplay_running)),
                drift_decorative_balls
                    .run_if(
                        in_state(AppState::Intro)
                            .or(in_state(AppState::MainMenu))
                            .or(in_state(AppState::HighScores)),
                    )
                    .run_if(not(resource_exists::<CameraTransition>)),
            ),
        );
    }
}

/// A ball's motion state. The speed scalar is kept separately from the
/// velocity so steering and speed changes can be applied independently;
/// it is clamped to 550..=850 whenever a new angle is set.
#[derive(Component)]
pub struct Ball {
    pub speed: f32,
    pub velocity: Vec2,
}

/// Passes through breakable bricks, still damaging them.
#[derive(Component)]
pub struct Invincible;

/// Stuck to the paddle until released with Space.
#[derive(Component)]
pub struct Magnetic;

/// Menu-screen ball; bounces silently and never interacts with gameplay.
#[derive(Component)]
pub struct Decorative;

impl Ball {
    pub fn new() -> Self {
        let mut ball = Ball {
            speed: BALL_MIN_SPEED,
            velocity: Vec2::ZERO,
        };
        ball.launch(45.0);
        ball
    }

    /// Clamps the speed and points the velocity at the given angle
    /// (degrees, counterclockwise from +x).
    pub fn launch(&mut self, angle_degrees: f32) {
        self.speed = self.speed.clamp(BALL_MIN_SPEED, BALL_MAX_SPEED);
        let radians = angle_degrees.to_radians();
        self.velocity = Vec2::new(radians.cos(), radians.sin()) * self.speed;
    }

    /// Where the ball lands on the paddle decides the exit angle: the
    /// middle band keeps the travel direction at 55 degrees, the outer
    /// thirds steer outward at up to 70 degrees and add speed.
    pub fn steer_off_paddle(&mut self, landing_x: f32, paddle_left: f32, paddle_width: f32) {
        const MIDDLE: f32 = 20.0;
        const LOWEST_ANGLE: f32 = 25.0;
        const HIGHEST_ANGLE: f32 = 70.0;
        const EDGE_BOOST: f32 = 40.0;

        let difference = landing_x - paddle_left;

        if difference < paddle_width / 2.0 - MIDDLE / 2.0 {
            let angle = (LOWEST_ANGLE + difference).min(HIGHEST_ANGLE);
            self.speed += EDGE_BOOST - difference;
            self.launch(180.0 - angle);
        } else if difference <= paddle_width / 2.0 + MIDDLE / 2.0 {
            let angle = if self.velocity.x > 0.0 { 55.0 } else { 125.0 };
            self.speed -= 20.0;
            self.launch(angle);
        } else {
            let angle = (paddle_width - difference + LOWEST_ANGLE).min(HIGHEST_ANGLE);
            self.speed += difference - paddle_width + EDGE_BOOST;
            self.launch(angle);
        }
    }

    /// Speeds up or slows down without changing direction.
    pub fn nudge_speed(&mut self, delta: f32) {
        self.speed = (self.speed + delta).clamp(BALL_MIN_SPEED, BALL_MAX_SPEED);
        if let Some(direction) = self.velocity.try_normalize() {
            self.velocity = direction * self.speed;
        }
    }
}

/// The ball has come to rest on top of the paddle; charges and magnetism
/// get applied before it bounces away.
#[derive(Event)]
pub struct BallLanded {
    pub ball: Entity,
}

/// Frees every magnetic ball from the paddle.
#[derive(Event)]
pub struct ReleaseBalls;

pub fn spawn_ball(commands: &mut Commands, asset_server: &AssetServer, boundary: &Boundary) {
    commands.spawn((
        Sprite {
            image: asset_server.load(NORMAL_BALL_IMAGE),
            custom_size: Some(Vec2::splat(BALL_SIZE)),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.inner_bottom + 80.0, 2.0),
        Hitbox(Vec2::splat(BALL_SIZE)),
        Ball::new(),
        LevelEntity,
    ));
}

pub fn spawn_random_balls(
    commands: &mut Commands,
    asset_server: &AssetServer,
    boundary: &Boundary,
    tag: impl Bundle + Clone,
) {
    let mut rng = rand::thread_rng();
    let image = asset_server.load(NORMAL_BALL_IMAGE);

    for i in 0..RANDOM_BALLS {
        let mut ball = Ball::new();
        ball.launch(rng.gen_range(45.0..60.0));
        if i % 2 == 0 {
            ball.velocity = -ball.velocity;
        }
        let x = rng.gen_range(boundary.inner_left + BALL_SIZE..boundary.inner_right - BALL_SIZE);
        let y = rng.gen_range(boundary.inner_bottom + BALL_SIZE..boundary.inner_top - BALL_SIZE);

        commands.spawn((
            Sprite {
                image: image.clone(),
                custom_size: Some(Vec2::splat(BALL_SIZE)),
                ..default()
            },
            Transform::from_xyz(x, y, 2.0),
            Hitbox(Vec2::splat(BALL_SIZE)),
            ball,
            Decorative,
            tag.clone(),
        ));
    }
}

/// Moves every free ball one axis at a time: step x and resolve, then
/// step y and resolve. Resolving each axis separately is what makes a
/// brick reflect the correct axis when a corner is clipped.
fn move_balls(
    time: Res<Time>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    mut commands: Commands,
    mut balls: Query<
        (Entity, &mut Ball, &mut Transform, &Hitbox, Has<Invincible>),
        (
            Without<Magnetic>,
            Without<Decorative>,
            Without<Brick>,
            Without<Paddle>,
        ),
    >,
    bricks: Query<(Entity, &Brick, &Transform, &Hitbox), Without<Paddle>>,
    paddles: Query<(&Transform, &Hitbox), (With<Paddle>, Without<Ball>)>,
) {
    let dt = time.delta_secs();
    let paddle = paddles.single().ok();

    for (entity, mut ball, mut transform, hitbox, invincible) in balls.iter_mut() {
        let half = hitbox.half();

        // Horizontal step
        transform.translation.x += ball.velocity.x * dt;

        if transform.translation.x + half.x > boundary.inner_right {
            transform.translation.x = boundary.inner_right - half.x;
            ball.velocity.x = -ball.velocity.x;
            play_sfx(&mut commands, &audio.hit_side_boundary);
        } else if transform.translation.x - half.x < boundary.inner_left {
            transform.translation.x = boundary.inner_left + half.x;
            ball.velocity.x = -ball.velocity.x;
            play_sfx(&mut commands, &audio.hit_side_boundary);
        }

        resolve_bricks(
            Axis::X,
            &mut ball,
            &mut transform,
            half,
            invincible,
            &bricks,
            &mut commands,
        );

        if let Some((paddle_transform, paddle_hitbox)) = paddle {
            let p_center = paddle_transform.translation.truncate();
            let p_half = paddle_hitbox.half();
            let center = transform.translation.truncate();

            if overlaps(center, hitbox.0, p_center, paddle_hitbox.0) {
                play_sfx(&mut commands, &audio.hit_paddle);

                // Both the ball and the paddle can be moving, so the side
                // is judged from travel direction plus relative position.
                if ball.velocity.x < 0.0 && center.x < p_center.x {
                    ball.speed += 100.0;
                    ball.launch(180.0 + 15.0);
                } else if ball.velocity.x > 0.0 && center.x > p_center.x {
                    ball.speed += 100.0;
                    ball.launch(-15.0);
                } else if ball.velocity.x > 0.0 {
                    transform.translation.x = p_center.x - p_half.x - half.x;
                    ball.velocity.x = -ball.velocity.x;
                } else if ball.velocity.x < 0.0 {
                    transform.translation.x = p_center.x + p_half.x + half.x;
                    ball.velocity.x = -ball.velocity.x;
                }
            }
        }

        // Vertical step
        transform.translation.y += ball.velocity.y * dt;

        if transform.translation.y + half.y > boundary.inner_top {
            transform.translation.y = boundary.inner_top - half.y;
            ball.velocity.y = -ball.velocity.y;
            play_sfx(&mut commands, &audio.hit_top_boundary);
        } else if boundary.reflects_bottom
            && transform.translation.y - half.y < boundary.inner_bottom
        {
            transform.translation.y = boundary.inner_bottom + half.y;
            ball.velocity.y = -ball.velocity.y;
            play_sfx(&mut commands, &audio.hit_bottom_boundary);
        } else if transform.translation.y + half.y < boundary.inner_bottom {
            commands.entity(entity).despawn();
            continue;
        }

        resolve_bricks(
            Axis::Y,
            &mut ball,
            &mut transform,
            half,
            invincible,
            &bricks,
            &mut commands,
        );

        if let Some((paddle_transform, paddle_hitbox)) = paddle {
            let p_center = paddle_transform.translation.truncate();
            let p_half = paddle_hitbox.half();
            let center = transform.translation.truncate();

            if overlaps(center, hitbox.0, p_center, paddle_hitbox.0) {
                play_sfx(&mut commands, &audio.hit_paddle);

                let paddle_top = p_center.y + p_half.y;
                if ball.velocity.y < 0.0
                    && center.y < paddle_top
                    && center.x < p_center.x - p_half.x
                {
                    ball.speed += 100.0;
                    ball.launch(180.0 + 15.0);
                } else if ball.velocity.y < 0.0
                    && center.y < paddle_top
                    && center.x > p_center.x + p_half.x
                {
                    ball.speed += 100.0;
                    ball.launch(-15.0);
                } else if ball.velocity.y > 0.0 {
                    transform.translation.y = p_center.y - p_half.y - half.y;
                    ball.velocity.y = -ball.velocity.y;
                } else if ball.velocity.y < 0.0 {
                    transform.translation.y = paddle_top + half.y;
                    commands.trigger(BallLanded { ball: entity });
                }
            }
        }
    }
}

enum Axis {
    X,
    Y,
}

/// Reflects the ball off the first contacted brick and reports a hit on
/// every contacted one. Invincible balls reflect only off unbreakable
/// bricks, except the safety barrier always reflects them vertically.
fn resolve_bricks(
    axis: Axis,
    ball: &mut Ball,
    transform: &mut Transform,
    half: Vec2,
    invincible: bool,
    bricks: &Query<(Entity, &Brick, &Transform, &Hitbox), Without<Paddle>>,
    commands: &mut Commands,
) {
    let center = transform.translation.truncate();
    let mut reflected = false;

    for (entity, brick, brick_transform, brick_hitbox) in bricks.iter() {
        let b_center = brick_transform.translation.truncate();
        if !overlaps(center, half * 2.0, b_center, brick_hitbox.0) {
            continue;
        }

        let reflects = match axis {
            // A barrier spawned on top of a sideways-moving ball must not
            // flip its x direction.
            Axis::X => {
                if invincible {
                    !brick.kind.breakable() && !brick.kind.is_barrier()
                } else {
                    !brick.kind.is_barrier()
                }
            }
            Axis::Y => {
                if invincible {
                    !brick.kind.breakable() || brick.kind.is_barrier()
                } else {
                    true
                }
            }
        };

        if reflects && !reflected {
            reflected = true;
            let b_half = brick_hitbox.half();
            match axis {
                Axis::X => {
                    if ball.velocity.x > 0.0 {
                        transform.translation.x = b_center.x - b_half.x - half.x;
                    } else {
                        transform.translation.x = b_center.x + b_half.x + half.x;
                    }
                    ball.velocity.x = -ball.velocity.x;
                }
                Axis::Y => {
                    if ball.velocity.y > 0.0 {
                        transform.translation.y = b_center.y - b_half.y - half.y;
                    } else {
                        transform.translation.y = b_center.y + b_half.y + half.y;
                    }
                    ball.velocity.y = -ball.velocity.y;
                }
            }
        }

        commands.trigger(DamageBrick { brick: entity });
    }
}

/// A ball settling on the paddle top consumes paddle charges: it may turn
/// invincible or normal, stick to a magnetic paddle, or bounce off with a
/// steer and an optional split.
fn on_ball_landed(
    trigger: On<BallLanded>,
    mut balls: Query<(&mut Ball, &mut Sprite, &Transform, Has<Invincible>), Without<Paddle>>,
    mut paddles: Query<(&mut Paddle, &Transform, &Hitbox), Without<Ball>>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    let Ok((mut paddle, paddle_transform, paddle_hitbox)) = paddles.single_mut() else {
        return;
    };
    let Ok((mut ball, mut sprite, ball_transform, was_invincible)) = balls.get_mut(trigger.ball)
    else {
        return;
    };

    let mut invincible = was_invincible;
    if paddle.invincible_charges > 0 {
        if !invincible {
            commands.entity(trigger.ball).insert(Invincible);
            sprite.image = asset_server.load(INVINCIBLE_BALL_IMAGE);
            invincible = true;
        }
        paddle.invincible_charges -= 1;
    } else if invincible {
        commands.entity(trigger.ball).remove::<Invincible>();
        sprite.image = asset_server.load(NORMAL_BALL_IMAGE);
        invincible = false;
    }

    if paddle.magnetic {
        commands.entity(trigger.ball).insert(Magnetic);
        ball.velocity = Vec2::ZERO;
    } else {
        let paddle_left = paddle_transform.translation.x - paddle_hitbox.half().x;
        ball.steer_off_paddle(ball_transform.translation.x, paddle_left, paddle_hitbox.0.x);

        if paddle.split_charges > 0 {
            paddle.split_charges -= 1;
            spawn_split(
                &mut commands,
                &asset_server,
                &ball,
                ball_transform.translation,
                invincible,
            );
        }
    }
}

fn on_release_balls(
    _trigger: On<ReleaseBalls>,
    mut balls: Query<
        (Entity, &mut Ball, &Transform, Has<Invincible>),
        (With<Magnetic>, Without<Paddle>),
    >,
    mut paddles: Query<(&mut Paddle, &Transform, &Hitbox), Without<Ball>>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    let Ok((mut paddle, paddle_transform, paddle_hitbox)) = paddles.single_mut() else {
        return;
    };
    let paddle_left = paddle_transform.translation.x - paddle_hitbox.half().x;

    for (entity, mut ball, transform, invincible) in balls.iter_mut() {
        commands.entity(entity).remove::<Magnetic>();
        ball.steer_off_paddle(transform.translation.x, paddle_left, paddle_hitbox.0.x);

        if paddle.split_charges > 0 {
            paddle.split_charges -= 1;
            spawn_split(
                &mut commands,
                &asset_server,
                &ball,
                transform.translation,
                invincible,
            );
        }
    }
}

fn spawn_split(
    commands: &mut Commands,
    asset_server: &AssetServer,
    original: &Ball,
    position: Vec3,
    invincible: bool,
) {
    let image = if invincible {
        INVINCIBLE_BALL_IMAGE
    } else {
        NORMAL_BALL_IMAGE
    };
    let mut entity = commands.spawn((
        Sprite {
            image: asset_server.load(image),
            custom_size: Some(Vec2::splat(BALL_SIZE)),
            ..default()
        },
        Transform::from_translation(position),
        Hitbox(Vec2::splat(BALL_SIZE)),
        Ball {
            speed: original.speed,
            velocity: Vec2::new(-original.velocity.x, original.velocity.y),
        },
        LevelEntity,
    ));
    if invincible {
        entity.insert(Invincible);
    }
}

/// Menu-screen balls bounce off all four inner edges, silently.
fn drift_decorative_balls(
    time: Res<Time>,
    boundary: Option<Res<Boundary>>,
    mut balls: Query<(&mut Ball, &mut Transform, &Hitbox), With<Decorative>>,
) {
    let Some(boundary) = boundary else {
        return;
    };
    let dt = time.delta_secs();

    for (mut ball, mut transform, hitbox) in balls.iter_mut() {
        let half = hitbox.half();
        transform.translation.x += ball.velocity.x * dt;

        if transform.translation.x + half.x > boundary.inner_right {
            transform.translation.x = boundary.inner_right - half.x;
            ball.velocity.x = -ball.velocity.x;
        } else if transform.translation.x - half.x < boundary.inner_left {
            transform.translation.x = boundary.inner_left + half.x;
            ball.velocity.x = -ball.velocity.x;
        }

        transform.translation.y += ball.velocity.y * dt;

        if transform.translation.y + half.y > boundary.inner_top {
            transform.translation.y = boundary.inner_top - half.y;
            ball.velocity.y = -ball.velocity.y;
        } else if transform.translation.y - half.y < boundary.inner_bottom {
            transform.translation.y = boundary.inner_bottom + half.y;
            ball.velocity.y = -ball.velocity.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_moving(vx: f32, vy: f32) -> Ball {
        let speed = Vec2::new(vx, vy).length().clamp(BALL_MIN_SPEED, BALL_MAX_SPEED);
        Ball {
            speed,
            velocity: Vec2::new(vx, vy),
        }
    }

    #[test]
    fn launch_clamps_speed() {
        let mut ball = Ball::new();
        ball.speed = 10_000.0;
        ball.launch(45.0);
        assert!((ball.velocity.length() - BALL_MAX_SPEED).abs() < 0.5);

        ball.speed = 1.0;
        ball.launch(45.0);
        assert!((ball.velocity.length() - BALL_MIN_SPEED).abs() < 0.5);
    }

    #[test]
    fn middle_band_keeps_direction_at_55_degrees() {
        let width = 150.0;

        let mut rightward = ball_moving(400.0, -400.0);
        rightward.steer_off_paddle(500.0 + width / 2.0, 500.0, width);
        assert!(rightward.velocity.x > 0.0);
        assert!(rightward.velocity.y > 0.0);
        let angle = rightward.velocity.y.atan2(rightward.velocity.x).to_degrees();
        assert!((angle - 55.0).abs() < 0.01);

        let mut leftward = ball_moving(-400.0, -400.0);
        leftward.steer_off_paddle(500.0 + width / 2.0, 500.0, width);
        assert!(leftward.velocity.x < 0.0);
        assert!(leftward.velocity.y > 0.0);
    }

    #[test]
    fn left_side_bounces_left_and_up() {
        let mut ball = ball_moving(400.0, -400.0);
        ball.steer_off_paddle(510.0, 500.0, 150.0);
        assert!(ball.velocity.x < 0.0);
        assert!(ball.velocity.y > 0.0);
    }

    #[test]
    fn right_side_bounces_right_with_capped_angle() {
        let mut ball = ball_moving(-400.0, -400.0);
        ball.steer_off_paddle(648.0, 500.0, 150.0);
        assert!(ball.velocity.x > 0.0);
        assert!(ball.velocity.y > 0.0);
        let angle = ball.velocity.y.atan2(ball.velocity.x).to_degrees();
        assert!(angle <= 70.01);
    }

    #[test]
    fn nudge_preserves_direction() {
        let mut ball = ball_moving(550.0, 0.0);
        ball.nudge_speed(SPEED_STEP);
        assert!(ball.velocity.x > 0.0);
        assert!((ball.velocity.y).abs() < 0.001);
        assert_eq!(ball.speed, 600.0);

        // Already at the floor; slowing down has no effect.
        let mut slow = ball_moving(-550.0, 0.0);
        slow.nudge_speed(-SPEED_STEP);
        assert_eq!(slow.speed, BALL_MIN_SPEED);
        assert!(slow.velocity.x < 0.0);
    }

    #[test]
    fn nudge_updates_a_held_ball_without_moving_it() {
        // A ball stuck to a magnetic paddle has zero velocity; speed
        // icons still adjust its stored speed for the release.
        let mut held = Ball {
            speed: 600.0,
            velocity: Vec2::ZERO,
        };
        held.nudge_speed(SPEED_STEP);
        assert_eq!(held.speed, 650.0);
        assert_eq!(held.velocity, Vec2::ZERO);

        held.nudge_speed(-3.0 * SPEED_STEP);
        assert_eq!(held.speed, BALL_MIN_SPEED);
        assert_eq!(held.velocity, Vec2::ZERO);
    }
}
