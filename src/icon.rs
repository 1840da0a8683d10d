use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio};
use crate::ball::{Ball, Invincible, Magnetic, SPEED_STEP};
use crate::brick::{self, Brick};
use crate::layout::{overlaps, Boundary, Hitbox};
use crate::level::{self, CompleteLevel, DemoMode, LevelEntity};
use crate::paddle::{self, Paddle};
use crate::session::Session;
use crate::AppState;

pub const ICON_SPEED: f32 = 100.0;
pub const ICON_SIZE: f32 = 40.0;

pub struct IconPlugin;

impl Plugin for IconPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_icon_collected);
        app.add_systems(
            Update,
            (
                animate_icons,
                fall_and_catch.run_if(in_state(AppState::Playing).and(level::gameplay_running)),
            ),
        );
    }
}

/// A power-up released from a destroyed brick. Each kind animates through
/// its own frame sequence at its own pace.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IconKind {
    Lengthen,
    Shorten,
    Magnet,
    BonusScore,
    Shooter,
    Split,
    ExtraLife,
    SafetyBarrier,
    AdvanceLevel,
    SpeedUp,
    SlowDown,
    InvincibleBall,
}

impl IconKind {
    pub fn frames(self) -> &'static [&'static str] {
        match self {
            IconKind::Lengthen => &[
                "images/icons/lengthen_paddle_icon_1.png",
                "images/icons/lengthen_paddle_icon_2.png",
                "images/icons/lengthen_paddle_icon_3.png",
                "images/icons/lengthen_paddle_icon_4.png",
            ],
            IconKind::Shorten => &[
                "images/icons/shorten_paddle_icon_1.png",
                "images/icons/shorten_paddle_icon_2.png",
                "images/icons/shorten_paddle_icon_3.png",
                "images/icons/shorten_paddle_icon_4.png",
            ],
            IconKind::Magnet => &[
                "images/icons/magnetic_paddle_icon_1.png",
                "images/icons/magnetic_paddle_icon_2.png",
                "images/icons/magnetic_paddle_icon_3.png",
                "images/icons/magnetic_paddle_icon_4.png",
            ],
            IconKind::BonusScore => &[
                "images/icons/bonus_score_icon_1.png",
                "images/icons/bonus_score_icon_2.png",
            ],
            IconKind::Shooter => &[
                "images/icons/shooting_icon_1.png",
                "images/icons/shooting_icon_2.png",
            ],
            IconKind::Split => &[
                "images/icons/split_ball_icon_1.png",
                "images/icons/split_ball_icon_2.png",
                "images/icons/split_ball_icon_3.png",
                "images/icons/split_ball_icon_4.png",
            ],
            IconKind::ExtraLife => &[
                "images/icons/bonus_life_icon_1.png",
                "images/icons/bonus_life_icon_2.png",
            ],
            // Ping-pong sequence baked into the frame list.
            IconKind::SafetyBarrier => &[
                "images/icons/safety_barrier_icon_1.png",
                "images/icons/safety_barrier_icon_2.png",
                "images/icons/safety_barrier_icon_3.png",
                "images/icons/safety_barrier_icon_2.png",
                "images/icons/safety_barrier_icon_1.png",
                "images/icons/safety_barrier_icon_4.png",
                "images/icons/safety_barrier_icon_5.png",
                "images/icons/safety_barrier_icon_6.png",
                "images/icons/safety_barrier_icon_5.png",
                "images/icons/safety_barrier_icon_4.png",
            ],
            IconKind::AdvanceLevel => &[
                "images/icons/advance_level_icon_1.png",
                "images/icons/advance_level_icon_2.png",
                "images/icons/advance_level_icon_3.png",
                "images/icons/advance_level_icon_4.png",
            ],
            IconKind::SpeedUp => &[
                "images/icons/speed_up_ball_icon_1.png",
                "images/icons/speed_up_ball_icon_2.png",
            ],
            IconKind::SlowDown => &[
                "images/icons/slow_down_ball_icon_1.png",
                "images/icons/slow_down_ball_icon_2.png",
            ],
            IconKind::InvincibleBall => &[
                "images/icons/invincible_ball_icon_1.png",
                "images/icons/invincible_ball_icon_2.png",
                "images/icons/invincible_ball_icon_3.png",
                "images/icons/invincible_ball_icon_2.png",
            ],
        }
    }

    /// Seconds each frame stays up, from the per-kind frame counts at the
    /// original 60 updates per second.
    pub fn frame_seconds(self) -> f32 {
        let frames: f32 = match self {
            IconKind::SafetyBarrier | IconKind::AdvanceLevel => 3.0,
            IconKind::BonusScore | IconKind::Shooter | IconKind::InvincibleBall => 8.0,
            IconKind::Split | IconKind::ExtraLife | IconKind::SpeedUp | IconKind::SlowDown => 10.0,
            _ => 5.0,
        };
        frames / 60.0
    }

    pub fn tone(self, audio: &GameAudio) -> &Handle<AudioSource> {
        match self {
            IconKind::Lengthen => &audio.lengthen_icon_tone,
            IconKind::Shorten => &audio.shorten_icon_tone,
            IconKind::BonusScore => &audio.bonus_score_icon_tone,
            IconKind::Shooter => &audio.shooting_icon_tone,
            IconKind::ExtraLife => &audio.bonus_life_icon_tone,
            IconKind::SpeedUp => &audio.speed_up_icon_tone,
            IconKind::SlowDown => &audio.slow_down_icon_tone,
            IconKind::InvincibleBall => &audio.invincible_ball_icon_tone,
            _ => &audio.collect_icon_tone,
        }
    }
}

/// Animated icon art, used both for falling icons and the how-to-play
/// catalogue.
#[derive(Component)]
pub struct IconSprite {
    pub kind: IconKind,
    pub frame: usize,
    pub timer: Timer,
}

impl IconSprite {
    pub fn new(kind: IconKind) -> Self {
        IconSprite {
            kind,
            frame: 0,
            timer: Timer::from_seconds(kind.frame_seconds(), TimerMode::Repeating),
        }
    }
}

/// A live falling icon the paddle can catch.
#[derive(Component)]
pub struct FallingIcon;

#[derive(Event)]
pub struct IconCollected {
    pub kind: IconKind,
}

pub fn spawn_falling(
    commands: &mut Commands,
    asset_server: &AssetServer,
    kind: IconKind,
    position: Vec2,
) {
    commands.spawn((
        Sprite {
            image: asset_server.load(kind.frames()[0]),
            custom_size: Some(Vec2::splat(ICON_SIZE)),
            ..default()
        },
        Transform::from_xyz(position.x, position.y, 3.0),
        Hitbox(Vec2::splat(ICON_SIZE)),
        IconSprite::new(kind),
        FallingIcon,
        LevelEntity,
    ));
}

/// Spawns a non-falling icon for display screens.
pub fn spawn_display(
    commands: &mut Commands,
    asset_server: &AssetServer,
    kind: IconKind,
    position: Vec2,
    tag: impl Bundle,
) {
    commands.spawn((
        Sprite {
            image: asset_server.load(kind.frames()[0]),
            custom_size: Some(Vec2::splat(ICON_SIZE)),
            ..default()
        },
        Transform::from_xyz(position.x, position.y, 3.0),
        IconSprite::new(kind),
        tag,
    ));
}

fn animate_icons(
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    mut icons: Query<(&mut IconSprite, &mut Sprite)>,
) {
    for (mut icon, mut sprite) in icons.iter_mut() {
        icon.timer.tick(time.delta());
        if icon.timer.just_finished() {
            let frames = icon.kind.frames();
            icon.frame = (icon.frame + 1) % frames.len();
            sprite.image = asset_server.load(frames[icon.frame]);
        }
    }
}

fn fall_and_catch(
    time: Res<Time>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    mut icons: Query<(Entity, &IconSprite, &mut Transform, &Hitbox), With<FallingIcon>>,
    paddles: Query<(&Transform, &Hitbox), (With<Paddle>, Without<FallingIcon>)>,
    mut commands: Commands,
) {
    let paddle = paddles.single().ok();

    for (entity, icon, mut transform, hitbox) in icons.iter_mut() {
        transform.translation.y -= ICON_SPEED * time.delta_secs();
        let center = transform.translation.truncate();

        if let Some((paddle_transform, paddle_hitbox)) = paddle {
            if overlaps(
                center,
                hitbox.0,
                paddle_transform.translation.truncate(),
                paddle_hitbox.0,
            ) {
                play_sfx(&mut commands, icon.kind.tone(&audio));
                commands.trigger(IconCollected { kind: icon.kind });
                commands.entity(entity).despawn();
                continue;
            }
        }

        if center.y + hitbox.half().y < boundary.inner_bottom {
            commands.entity(entity).despawn();
        }
    }
}

/// Applies a caught icon's effect. The demo autopilot skips the magnet and
/// level-advance icons so the demo keeps running on its own.
fn on_icon_collected(
    trigger: On<IconCollected>,
    demo: Option<Res<DemoMode>>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    mut session: ResMut<Session>,
    mut paddles: Query<
        (&mut Paddle, &mut Sprite, &mut Transform, &mut Hitbox),
        Without<Ball>,
    >,
    mut balls: Query<
        (
            Entity,
            &mut Ball,
            &mut Sprite,
            &Transform,
            Has<Magnetic>,
            Has<Invincible>,
        ),
        (With<Ball>, Without<Paddle>),
    >,
    barriers: Query<(Entity, &Brick)>,
    mut commands: Commands,
) {
    let Ok((mut paddle, mut sprite, mut transform, mut hitbox)) = paddles.single_mut() else {
        return;
    };

    match trigger.kind {
        IconKind::Lengthen => {
            paddle.size = paddle.size.grown();
            paddle::apply_size(
                paddle.size,
                &mut sprite,
                &mut hitbox,
                &mut transform,
                &boundary,
                &asset_server,
            );
            // A longer paddle would make things too easy otherwise.
            for (_, mut ball, _, _, _, _) in balls.iter_mut() {
                ball.nudge_speed(SPEED_STEP);
            }
        }
        IconKind::Shorten => {
            paddle.size = paddle.size.shrunk();
            paddle::apply_size(
                paddle.size,
                &mut sprite,
                &mut hitbox,
                &mut transform,
                &boundary,
                &asset_server,
            );
            // Balls left hanging past the new edges drop straight down.
            let left = transform.translation.x - hitbox.half().x;
            let right = transform.translation.x + hitbox.half().x;
            for (entity, mut ball, _, ball_transform, magnetic, _) in balls.iter_mut() {
                if magnetic
                    && (ball_transform.translation.x < left
                        || ball_transform.translation.x > right)
                {
                    commands.entity(entity).remove::<Magnetic>();
                    // Slower than the usual floor so the drop is catchable.
                    ball.speed = 200.0;
                    ball.velocity = Vec2::new(0.0, -200.0);
                }
            }
        }
        IconKind::Magnet => {
            if demo.is_none() {
                paddle.magnetic = true;
            }
        }
        IconKind::BonusScore => {
            session.score += 5000;
            play_sfx(&mut commands, &audio.adding_bonus_3);
        }
        IconKind::Shooter => {
            paddle.shooter = true;
        }
        IconKind::Split => {
            paddle.split_charges += 3;
        }
        IconKind::ExtraLife => {
            session.lives += 1;
        }
        IconKind::SafetyBarrier => {
            for (entity, existing) in barriers.iter() {
                if existing.kind.is_barrier() {
                    commands.entity(entity).despawn();
                }
            }
            brick::spawn_safety_barrier(&mut commands, &boundary);
        }
        IconKind::AdvanceLevel => {
            if demo.is_none() {
                commands.trigger(CompleteLevel);
            }
        }
        IconKind::SpeedUp => {
            paddle.magnetic = false;
            commands.trigger(crate::ball::ReleaseBalls);
            // Held balls have zero velocity; only their stored speed
            // moves, and it takes effect on release.
            for (_, mut ball, _, _, _, _) in balls.iter_mut() {
                ball.nudge_speed(SPEED_STEP);
            }
        }
        IconKind::SlowDown => {
            for (_, mut ball, _, _, _, _) in balls.iter_mut() {
                ball.nudge_speed(-SPEED_STEP);
            }
        }
        IconKind::InvincibleBall => {
            paddle.invincible_charges += 3;
            // Balls already held on the paddle get upgraded right away.
            for (entity, _, mut ball_sprite, _, magnetic, invincible) in balls.iter_mut() {
                if magnetic && !invincible && paddle.invincible_charges > 0 {
                    commands.entity(entity).insert(Invincible);
                    ball_sprite.image = asset_server.load(crate::ball::INVINCIBLE_BALL_IMAGE);
                    paddle.invincible_charges -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_frames() {
        let kinds = [
            IconKind::Lengthen,
            IconKind::Shorten,
            IconKind::Magnet,
            IconKind::BonusScore,
            IconKind::Shooter,
            IconKind::Split,
            IconKind::ExtraLife,
            IconKind::SafetyBarrier,
            IconKind::AdvanceLevel,
            IconKind::SpeedUp,
            IconKind::SlowDown,
            IconKind::InvincibleBall,
        ];
        for kind in kinds {
            assert!(!kind.frames().is_empty());
            assert!(kind.frame_seconds() > 0.0);
        }
    }

    #[test]
    fn barrier_icon_animates_fastest() {
        assert!(IconKind::SafetyBarrier.frame_seconds() < IconKind::Lengthen.frame_seconds());
        assert!(IconKind::Lengthen.frame_seconds() < IconKind::Split.frame_seconds());
    }
}
