use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio};
use crate::layout::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::Fonts;

/// Gravity and restitution for the bounce-in, converted from the original
/// 60 Hz per-frame values.
const BOUNCE_GRAVITY: f32 = 1440.0;
const INITIAL_SPEED: f32 = 120.0;
const VELOCITY_RETAINED: f32 = 0.7;
const MAX_BOUNCES: u32 = 3;

/// How long the level announcement card stays on screen before the drop.
const CARD_SHOW_AT: f32 = 1.0;
const CARD_HIDE_AT: f32 = 4.0;
const DROP_AT: f32 = 5.0;

pub struct TransitionPlugin;

impl Plugin for TransitionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            run_transition.run_if(resource_exists::<CameraTransition>),
        );
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionKind {
    /// The camera drops onto the scene and settles with a few bounces.
    BounceIn,
    /// The camera accelerates up and away.
    SlideOut,
}

/// A scene transition driven by moving the camera rather than the scene.
/// While present, gameplay and input systems stay off.
#[derive(Resource)]
pub struct CameraTransition {
    kind: TransitionKind,
    /// Level to announce (bounce-in) or to build next (slide-out).
    level: Option<usize>,
    offset: f32,
    velocity: f32,
    bounces: u32,
    elapsed: f32,
    card: Option<Entity>,
    card_shown: bool,
}

impl CameraTransition {
    pub fn bounce_in(level: Option<usize>) -> Self {
        CameraTransition {
            kind: TransitionKind::BounceIn,
            level,
            offset: -SCREEN_HEIGHT,
            velocity: INITIAL_SPEED,
            bounces: 0,
            elapsed: 0.0,
            card: None,
            card_shown: false,
        }
    }

    pub fn slide_out(level: Option<usize>) -> Self {
        CameraTransition {
            kind: TransitionKind::SlideOut,
            level,
            offset: 0.0,
            velocity: INITIAL_SPEED,
            bounces: 0,
            elapsed: 0.0,
            card: None,
            card_shown: false,
        }
    }
}

/// Fired once the camera has come to rest (or left the screen).
#[derive(Event)]
pub struct TransitionFinished {
    pub kind: TransitionKind,
    pub level: Option<usize>,
}

fn run_transition(
    time: Res<Time>,
    audio: Res<GameAudio>,
    fonts: Res<Fonts>,
    mut transition: ResMut<CameraTransition>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
    mut commands: Commands,
) {
    let Ok(mut camera) = cameras.single_mut() else {
        return;
    };
    let dt = time.delta_secs();
    transition.elapsed += dt;

    let mut finished = false;
    match transition.kind {
        TransitionKind::BounceIn => {
            // A level announcement holds the camera below the field while
            // the card is up; the plain bounce-in starts dropping at once.
            if let Some(number) = transition.level {
                if !transition.card_shown && transition.elapsed > CARD_SHOW_AT {
                    transition.card_shown = true;
                    play_sfx(&mut commands, &audio.whoosh_2);
                    if let Some(voice) = audio.level_voices.get(number - 1) {
                        play_sfx(&mut commands, voice);
                    }
                    let card = commands
                        .spawn((
                            Text2d::new(format!("Level {number}")),
                            TextFont {
                                font: fonts.medium.clone(),
                                font_size: 100.0,
                                ..default()
                            },
                            TextColor(Color::srgb_u8(255, 85, 85)),
                            Transform::from_xyz(
                                SCREEN_WIDTH / 2.0,
                                -SCREEN_HEIGHT / 2.0,
                                10.0,
                            ),
                        ))
                        .id();
                    transition.card = Some(card);
                }
                if transition.elapsed > CARD_HIDE_AT {
                    if let Some(card) = transition.card.take() {
                        commands.entity(card).despawn();
                        play_sfx(&mut commands, &audio.whoosh_2);
                    }
                }
                if transition.elapsed <= DROP_AT {
                    camera.translation.y = SCREEN_HEIGHT / 2.0 + transition.offset;
                    return;
                }
            }

            transition.velocity += BOUNCE_GRAVITY * dt;
            transition.offset += transition.velocity * dt;
            if transition.offset >= 0.0 {
                transition.offset = 0.0;
                transition.bounces += 1;
                if transition.bounces >= MAX_BOUNCES {
                    finished = true;
                } else {
                    transition.velocity = -transition.velocity * VELOCITY_RETAINED;
                    let sound = if transition.bounces % 2 == 1 {
                        &audio.bounce_1
                    } else {
                        &audio.bounce_2
                    };
                    play_sfx(&mut commands, sound);
                }
            }
        }
        TransitionKind::SlideOut => {
            transition.velocity += BOUNCE_GRAVITY * dt;
            transition.offset += transition.velocity * dt;
            if transition.offset >= 2.0 * SCREEN_HEIGHT {
                finished = true;
                transition.offset = 0.0;
            }
        }
    }

    camera.translation.y = SCREEN_HEIGHT / 2.0 + transition.offset;

    if finished {
        if let Some(card) = transition.card.take() {
            commands.entity(card).despawn();
        }
        camera.translation.y = SCREEN_HEIGHT / 2.0;
        commands.remove_resource::<CameraTransition>();
        commands.trigger(TransitionFinished {
            kind: transition.kind,
            level: transition.level,
        });
    }
}
