use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME};
use crate::ball;
use crate::layout::{Boundary, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::level::PAUSE_TIME;
use crate::transitions::{CameraTransition, TransitionFinished, TransitionKind};
use crate::AppState;

pub struct IntroPlugin;

impl Plugin for IntroPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_intro_settled);
        app.add_systems(OnEnter(AppState::Intro), enter_intro);
        app.add_systems(OnExit(AppState::Intro), exit_intro);
        app.add_systems(
            Update,
            advance_intro
                .run_if(in_state(AppState::Intro).and(not(resource_exists::<CameraTransition>))),
        );
    }
}

#[derive(Component, Clone, Copy)]
struct IntroScreen;

#[derive(Resource, Default)]
struct IntroTimer {
    elapsed: f32,
}

fn enter_intro(asset_server: Res<AssetServer>, mut commands: Commands) {
    let boundary = Boundary::fullscreen();
    commands.insert_resource(boundary);
    commands.init_resource::<IntroTimer>();

    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/fullscreen_boundary_black_background.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
        IntroScreen,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/paranoid_intro_brick.png"),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 1.0),
        IntroScreen,
    ));
    ball::spawn_random_balls(&mut commands, &asset_server, &boundary, IntroScreen);

    commands.insert_resource(CameraTransition::bounce_in(None));
}

fn on_intro_settled(
    trigger: On<TransitionFinished>,
    state: Res<State<AppState>>,
    audio: Res<GameAudio>,
    mut commands: Commands,
) {
    if *state.get() == AppState::Intro && trigger.kind == TransitionKind::BounceIn {
        commands.trigger(StartMusic {
            track: audio.game_intro_music.clone(),
            volume: MUSIC_VOLUME,
        });
    }
}

/// The title card holds for a while, or skips ahead on Enter or Space.
fn advance_intro(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    mut timer: ResMut<IntroTimer>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    timer.elapsed += time.delta_secs();
    let skipped =
        keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Space);
    if skipped || timer.elapsed > PAUSE_TIME * 3.0 {
        play_sfx(&mut commands, &audio.whoosh);
        next_state.set(AppState::MainMenu);
    }
}

fn exit_intro(screen: Query<Entity, With<IntroScreen>>, mut commands: Commands) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<IntroTimer>();
    commands.trigger(StopMusic);
}
