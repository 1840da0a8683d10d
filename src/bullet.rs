use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio};
use crate::brick::{Brick, DamageBrick};
use crate::layout::{overlaps, Boundary, Hitbox};
use crate::level::{self, LevelEntity};
use crate::paddle::{Paddle, PADDLE_HEIGHT};
use crate::AppState;

pub const BULLET_SPEED: f32 = 300.0;
const BULLET_SIZE: Vec2 = Vec2::new(10.0, 24.0);

pub struct BulletPlugin;

impl Plugin for BulletPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_fire_bullet);
        app.add_systems(
            Update,
            move_bullets.run_if(in_state(AppState::Playing).and(level::gameplay_running)),
        );
    }
}

#[derive(Component)]
pub struct Bullet;

/// Fired from the paddle while the shooter power is held.
#[derive(Event)]
pub struct FireBullet;

fn on_fire_bullet(
    _trigger: On<FireBullet>,
    paddles: Query<(&Paddle, &Transform)>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    let Ok((paddle, transform)) = paddles.single() else {
        return;
    };
    if !paddle.shooter {
        return;
    }

    commands.spawn((
        Sprite {
            image: asset_server.load("images/icons/bullet.png"),
            custom_size: Some(BULLET_SIZE),
            ..default()
        },
        Transform::from_xyz(
            transform.translation.x,
            transform.translation.y + PADDLE_HEIGHT / 2.0 + BULLET_SIZE.y / 2.0,
            2.0,
        ),
        Hitbox(BULLET_SIZE),
        Bullet,
        LevelEntity,
    ));
    play_sfx(&mut commands, &audio.shoot_bullet);
}

/// Bullets fly straight up, damage everything they touch on the frame of
/// contact, and disappear. Unbreakable bricks stop them all the same.
fn move_bullets(
    time: Res<Time>,
    boundary: Res<Boundary>,
    mut bullets: Query<(Entity, &mut Transform, &Hitbox), (With<Bullet>, Without<Brick>)>,
    bricks: Query<(Entity, &Transform, &Hitbox), With<Brick>>,
    mut commands: Commands,
) {
    for (entity, mut transform, hitbox) in bullets.iter_mut() {
        transform.translation.y += BULLET_SPEED * time.delta_secs();

        let center = transform.translation.truncate();
        let mut hit = false;
        for (brick, brick_transform, brick_hitbox) in bricks.iter() {
            if overlaps(
                center,
                hitbox.0,
                brick_transform.translation.truncate(),
                brick_hitbox.0,
            ) {
                commands.trigger(DamageBrick { brick });
                hit = true;
            }
        }

        if hit || center.y - hitbox.half().y > boundary.inner_top {
            commands.entity(entity).despawn();
        }
    }
}
