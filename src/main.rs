use bevy::prelude::*;
use bevy::window::{CursorOptions, MonitorSelection, WindowMode};

use crate::layout::{SCREEN_HEIGHT, SCREEN_WIDTH};

mod audio;
mod ball;
mod brick;
mod bullet;
mod high_scores;
mod how_to_play;
mod hud;
mod icon;
mod intro;
mod layout;
mod level;
mod menu;
mod paddle;
mod pause;
mod session;
mod transitions;

/// Top-level screens. Everything inside a level, including the pause menu
/// and its dialogs, lives under `Playing`.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppState {
    #[default]
    Intro,
    MainMenu,
    HowToPlay,
    HighScores,
    NameEntry,
    Playing,
}

/// The two weights of the display typeface.
#[derive(Resource)]
pub struct Fonts {
    pub light: Handle<Font>,
    pub medium: Handle<Font>,
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Paranoid".to_string(),
                mode: WindowMode::BorderlessFullscreen(MonitorSelection::Primary),
                ..default()
            }),
            primary_cursor_options: Some(CursorOptions {
                visible: false,
                ..default()
            }),
            ..default()
        }))
        .init_state::<AppState>()
        .add_plugins((
            session::SessionPlugin,
            audio::GameAudioPlugin,
            high_scores::HighScoresPlugin,
            transitions::TransitionPlugin,
            intro::IntroPlugin,
            menu::MainMenuPlugin,
            how_to_play::HowToPlayPlugin,
            level::LevelPlugin,
            ball::BallPlugin,
            paddle::PaddlePlugin,
            brick::BrickPlugin,
            icon::IconPlugin,
            bullet::BulletPlugin,
            hud::HudPlugin,
            pause::PausePlugin,
        ))
        .add_systems(Startup, setup)
        .run();
}

/// The camera sits so that world coordinates run from (0, 0) at the
/// bottom-left corner of the screen, matching how every layout position
/// in the game is written.
fn setup(asset_server: Res<AssetServer>, mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
    ));
    commands.insert_resource(Fonts {
        light: asset_server.load("fonts/bgothl.ttf"),
        medium: asset_server.load("fonts/bgothm.ttf"),
    });
}
