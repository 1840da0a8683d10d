use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME, MUSIC_VOLUME_LOW};
use crate::how_to_play::ReturnTo;
use crate::layout::{Boundary, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::level::{DemoMode, LevelPhase, Phase};
use crate::menu::{ConfirmAction, ConfirmDialog};
use crate::session::Session;
use crate::transitions::CameraTransition;
use crate::{AppState, Fonts};

const HEADING_COLOR: Color = Color::srgb_u8(255, 85, 85);
const OPTION_COLOR: Color = Color::srgb_u8(215, 215, 215);
const SELECTED_COLOR: Color = Color::srgb_u8(85, 255, 255);

const OPTIONS: [&str; 4] = ["Continue", "New Game", "How To Play", "Main Menu"];

pub struct PausePlugin;

impl Plugin for PausePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                open_pause.run_if(
                    in_state(AppState::Playing)
                        .and(resource_exists::<LevelPhase>)
                        .and(not(resource_exists::<Paused>))
                        .and(not(resource_exists::<ConfirmDialog>))
                        .and(not(resource_exists::<CameraTransition>))
                        .and(not(resource_exists::<DemoMode>)),
                ),
                spawn_pause_ui.run_if(resource_added::<Paused>),
                pause_input.run_if(
                    resource_exists::<Paused>.and(not(resource_exists::<ConfirmDialog>)),
                ),
                sweep_pause_ui.run_if(not(resource_exists::<Paused>)),
            ),
        );
    }
}

/// Present while the pause menu is up; gameplay systems gate on it.
#[derive(Resource, Default)]
pub struct Paused {
    selected: usize,
}

#[derive(Component)]
struct PauseUi;

#[derive(Component)]
struct PauseOption(usize);

fn open_pause(
    keys: Res<ButtonInput<KeyCode>>,
    phase: Res<LevelPhase>,
    audio: Res<GameAudio>,
    mut commands: Commands,
) {
    if !keys.just_pressed(KeyCode::Escape) {
        return;
    }
    // The end-of-level sequences cannot be paused.
    if matches!(phase.kind, Phase::Complete | Phase::GameOver) {
        return;
    }

    commands.insert_resource(Paused::default());
    play_sfx(&mut commands, &audio.whoosh);
    commands.trigger(StartMusic {
        track: audio.pause_menu_music.clone(),
        volume: MUSIC_VOLUME,
    });
}

fn spawn_pause_ui(
    boundary: Res<Boundary>,
    fonts: Res<Fonts>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    commands.spawn((
        Sprite::from_color(
            Color::srgba(0.0, 0.0, 0.0, 0.4),
            Vec2::new(SCREEN_WIDTH, SCREEN_HEIGHT),
        ),
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 15.0),
        PauseUi,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/menu_boundary.png"),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 16.0),
        PauseUi,
    ));
    commands.spawn((
        Text2d::new("Paused"),
        TextFont {
            font: fonts.medium.clone(),
            font_size: 65.0,
            ..default()
        },
        TextColor(HEADING_COLOR),
        Transform::from_xyz(boundary.center_x(), 614.0, 17.0),
        PauseUi,
    ));
    for (index, label) in OPTIONS.iter().enumerate() {
        commands.spawn((
            Text2d::new(*label),
            TextFont {
                font: fonts.light.clone(),
                font_size: 40.0,
                ..default()
            },
            TextColor(if index == 0 { SELECTED_COLOR } else { OPTION_COLOR }),
            Transform::from_xyz(boundary.center_x(), 514.0 - 85.0 * index as f32, 17.0),
            PauseOption(index),
            PauseUi,
        ));
    }
}

fn pause_input(
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    session: Res<Session>,
    mut paused: ResMut<Paused>,
    mut options: Query<(&PauseOption, &mut TextColor, &mut TextFont)>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    if keys.just_pressed(KeyCode::ArrowUp) {
        paused.selected = (paused.selected + OPTIONS.len() - 1) % OPTIONS.len();
        play_sfx(&mut commands, &audio.scroll_options);
    } else if keys.just_pressed(KeyCode::ArrowDown) {
        paused.selected = (paused.selected + 1) % OPTIONS.len();
        play_sfx(&mut commands, &audio.scroll_options);
    }

    for (option, mut color, mut font) in options.iter_mut() {
        if option.0 == paused.selected {
            color.0 = SELECTED_COLOR;
            font.font_size = 50.0;
        } else {
            color.0 = OPTION_COLOR;
            font.font_size = 40.0;
        }
    }

    let resume = |commands: &mut Commands| {
        commands.remove_resource::<Paused>();
        commands.trigger(StartMusic {
            track: audio.level_music[session.level_number - 1].clone(),
            volume: MUSIC_VOLUME_LOW,
        });
    };

    if keys.just_pressed(KeyCode::Escape) {
        play_sfx(&mut commands, &audio.whoosh);
        resume(&mut commands);
        return;
    }
    if !keys.just_pressed(KeyCode::Enter) {
        return;
    }

    play_sfx(&mut commands, &audio.press_enter);
    match paused.selected {
        0 => resume(&mut commands),
        1 => {
            commands.insert_resource(ConfirmDialog::new(ConfirmAction::NewGame));
        }
        2 => {
            commands.remove_resource::<Paused>();
            commands.trigger(StopMusic);
            commands.insert_resource(ReturnTo::Pause);
            next_state.set(AppState::HowToPlay);
        }
        _ => {
            commands.insert_resource(ConfirmDialog::new(ConfirmAction::MainMenu));
        }
    }
}

/// Clears leftover pause chrome once the resource is gone, whichever path
/// removed it.
fn sweep_pause_ui(ui: Query<Entity, With<PauseUi>>, mut commands: Commands) {
    for entity in ui.iter() {
        commands.entity(entity).despawn();
    }
}
