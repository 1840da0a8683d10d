use bevy::app::AppExit;
use bevy::prelude::*;
use rand::Rng;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME};
use crate::ball;
use crate::how_to_play::ReturnTo;
use crate::layout::{Boundary, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::level::{BuildLevel, TeardownLevel, CAMPAIGN, DEMO_LEVEL_TIME};
use crate::pause::Paused;
use crate::session::Session;
use crate::transitions::CameraTransition;
use crate::AppState;
use crate::Fonts;

const HEADING_COLOR: Color = Color::srgb_u8(255, 85, 85);
const OPTION_COLOR: Color = Color::srgb_u8(215, 215, 215);
const SELECTED_COLOR: Color = Color::srgb_u8(85, 255, 255);

/// Seconds of inactivity on the main menu before a demo level starts.
const DEMO_IDLE_TIME: f32 = DEMO_LEVEL_TIME / 2.0;

const OPTIONS: [&str; 4] = ["New Game", "How To Play", "High Scores", "Quit"];

pub struct MainMenuPlugin;

impl Plugin for MainMenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::MainMenu), enter_menu);
        app.add_systems(OnExit(AppState::MainMenu), exit_menu);
        app.add_systems(
            Update,
            (
                (navigate_menu, start_demo_when_idle).run_if(
                    in_state(AppState::MainMenu)
                        .and(not(resource_exists::<ConfirmDialog>))
                        .and(not(resource_exists::<CameraTransition>)),
                ),
                spawn_dialog.run_if(resource_added::<ConfirmDialog>),
                dialog_input.run_if(resource_exists::<ConfirmDialog>),
            ),
        );
    }
}

#[derive(Component, Clone, Copy)]
struct MenuScreen;

#[derive(Component)]
struct MenuOption(usize);

#[derive(Resource)]
struct MenuState {
    selected: usize,
    idle: f32,
}

fn enter_menu(
    asset_server: Res<AssetServer>,
    fonts: Res<Fonts>,
    audio: Res<GameAudio>,
    mut commands: Commands,
) {
    let boundary = Boundary::fullscreen();
    commands.insert_resource(boundary);
    commands.insert_resource(MenuState {
        selected: 0,
        idle: 0.0,
    });

    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/fullscreen_boundary_black_background.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
        MenuScreen,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/menu_boundary.png"),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 1.0),
        MenuScreen,
    ));
    commands.spawn((
        Text2d::new("Main Menu"),
        TextFont {
            font: fonts.medium.clone(),
            font_size: 65.0,
            ..default()
        },
        TextColor(HEADING_COLOR),
        Transform::from_xyz(boundary.center_x(), 614.0, 2.0),
        MenuScreen,
    ));
    for (index, label) in OPTIONS.iter().enumerate() {
        commands.spawn((
            Text2d::new(*label),
            TextFont {
                font: fonts.light.clone(),
                font_size: 40.0,
                ..default()
            },
            TextColor(OPTION_COLOR),
            Transform::from_xyz(boundary.center_x(), 514.0 - 85.0 * index as f32, 2.0),
            MenuOption(index),
            MenuScreen,
        ));
    }
    ball::spawn_random_balls(&mut commands, &asset_server, &boundary, MenuScreen);

    commands.trigger(StartMusic {
        track: audio.main_menu_music.clone(),
        volume: MUSIC_VOLUME,
    });
}

fn exit_menu(screen: Query<Entity, With<MenuScreen>>, mut commands: Commands) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<MenuState>();
    commands.trigger(StopMusic);
}

fn navigate_menu(
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    mut state: ResMut<MenuState>,
    mut session: ResMut<Session>,
    mut options: Query<(&MenuOption, &mut TextColor, &mut TextFont)>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    if keys.get_just_pressed().next().is_some() {
        state.idle = 0.0;
    }

    if keys.just_pressed(KeyCode::ArrowUp) {
        state.selected = (state.selected + OPTIONS.len() - 1) % OPTIONS.len();
        play_sfx(&mut commands, &audio.scroll_options);
    } else if keys.just_pressed(KeyCode::ArrowDown) {
        state.selected = (state.selected + 1) % OPTIONS.len();
        play_sfx(&mut commands, &audio.scroll_options);
    }

    for (option, mut color, mut font) in options.iter_mut() {
        if option.0 == state.selected {
            color.0 = SELECTED_COLOR;
            font.font_size = 50.0;
        } else {
            color.0 = OPTION_COLOR;
            font.font_size = 40.0;
        }
    }

    if keys.just_pressed(KeyCode::Enter) {
        play_sfx(&mut commands, &audio.press_enter);
        match state.selected {
            0 => {
                session.reset();
                commands.trigger(BuildLevel {
                    number: 1,
                    demo: false,
                });
                next_state.set(AppState::Playing);
            }
            1 => {
                commands.insert_resource(ReturnTo::MainMenu);
                next_state.set(AppState::HowToPlay);
            }
            2 => next_state.set(AppState::HighScores),
            _ => {
                commands.insert_resource(ConfirmDialog::new(ConfirmAction::Quit));
            }
        }
    }
}

/// Left alone long enough, the menu plays a random level by itself.
fn start_demo_when_idle(
    time: Res<Time>,
    audio: Res<GameAudio>,
    mut state: ResMut<MenuState>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    state.idle += time.delta_secs();
    if state.idle < DEMO_IDLE_TIME {
        return;
    }
    play_sfx(&mut commands, &audio.whoosh);
    commands.trigger(BuildLevel {
        number: rand::thread_rng().gen_range(1..=CAMPAIGN.len()),
        demo: true,
    });
    next_state.set(AppState::Playing);
}

// ── Confirmation dialog ──────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    NewGame,
    MainMenu,
    Quit,
}

impl ConfirmAction {
    fn question(self) -> &'static str {
        match self {
            ConfirmAction::NewGame => "start a new game?",
            ConfirmAction::MainMenu => "go to the main menu?",
            ConfirmAction::Quit => "quit the game?",
        }
    }
}

/// Present while a yes/no confirmation sits over the screen. Defaults to
/// No so a double-tap of Enter never destroys a run.
#[derive(Resource)]
pub struct ConfirmDialog {
    pub action: ConfirmAction,
    selected: usize,
}

impl ConfirmDialog {
    pub fn new(action: ConfirmAction) -> Self {
        ConfirmDialog {
            action,
            selected: 1,
        }
    }
}

#[derive(Component)]
struct DialogUi;

#[derive(Component)]
struct DialogOption(usize);

fn spawn_dialog(
    dialog: Res<ConfirmDialog>,
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
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 20.0),
        DialogUi,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/confirmation_dialogue_boundary.png"),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 21.0),
        DialogUi,
    ));

    let line = |text: &str, y_offset: f32, size: f32, color: Color| {
        (
            Text2d::new(text),
            TextFont {
                font: fonts.light.clone(),
                font_size: size,
                ..default()
            },
            TextColor(color),
            Transform::from_xyz(boundary.center_x(), boundary.center_y() + y_offset, 22.0),
            DialogUi,
        )
    };
    commands.spawn(line(
        "Are you sure you want to",
        90.0,
        35.0,
        OPTION_COLOR,
    ));
    commands.spawn(line(dialog.action.question(), 45.0, 35.0, OPTION_COLOR));
    commands.spawn(line(
        "All progress will be lost!",
        -5.0,
        30.0,
        HEADING_COLOR,
    ));
    commands.spawn((line("Yes", -80.0, 35.0, OPTION_COLOR), DialogOption(0)));
    commands.spawn((line("No", -80.0, 35.0, SELECTED_COLOR), DialogOption(1)));
}

fn dialog_input(
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    boundary: Res<Boundary>,
    mut dialog: ResMut<ConfirmDialog>,
    mut options: Query<(&DialogOption, &mut TextColor, &mut Transform)>,
    ui: Query<Entity, With<DialogUi>>,
    mut session: ResMut<Session>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: MessageWriter<AppExit>,
    mut commands: Commands,
) {
    if keys.just_pressed(KeyCode::ArrowLeft) || keys.just_pressed(KeyCode::ArrowRight) {
        dialog.selected = 1 - dialog.selected;
        play_sfx(&mut commands, &audio.scroll_options);
    }

    for (option, mut color, mut transform) in options.iter_mut() {
        transform.translation.x =
            boundary.center_x() + if option.0 == 0 { -100.0 } else { 100.0 };
        color.0 = if option.0 == dialog.selected {
            SELECTED_COLOR
        } else {
            OPTION_COLOR
        };
    }

    let close = |commands: &mut Commands| {
        commands.remove_resource::<ConfirmDialog>();
        for entity in ui.iter() {
            commands.entity(entity).despawn();
        }
    };

    if keys.just_pressed(KeyCode::Escape) {
        play_sfx(&mut commands, &audio.whoosh);
        close(&mut commands);
        return;
    }
    if !keys.just_pressed(KeyCode::Enter) {
        return;
    }

    play_sfx(&mut commands, &audio.press_enter);
    if dialog.selected == 1 {
        close(&mut commands);
        return;
    }

    match dialog.action {
        ConfirmAction::Quit => {
            exit.write(AppExit::Success);
        }
        ConfirmAction::NewGame => {
            commands.trigger(TeardownLevel);
            commands.remove_resource::<Paused>();
            session.reset();
            commands.trigger(BuildLevel {
                number: 1,
                demo: false,
            });
            close(&mut commands);
        }
        ConfirmAction::MainMenu => {
            commands.trigger(TeardownLevel);
            commands.remove_resource::<Paused>();
            next_state.set(AppState::MainMenu);
            close(&mut commands);
        }
    }
}
