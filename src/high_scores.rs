use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;
use bevy::sprite::Anchor;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME_LOW};
use crate::ball;
use crate::layout::{Boundary, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::session::Session;
use crate::{AppState, Fonts};

const TABLE_SIZE: usize = 10;
const MAX_NAME_LENGTH: usize = 15;

const HEADING_COLOR: Color = Color::srgb_u8(255, 85, 85);
const ROW_COLOR: Color = Color::srgb_u8(215, 215, 215);
const HIGHLIGHT_COLOR: Color = Color::srgb_u8(85, 255, 85);

pub struct HighScoresPlugin;

impl Plugin for HighScoresPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_high_scores);
        app.add_systems(OnEnter(AppState::HighScores), enter_high_scores);
        app.add_systems(OnExit(AppState::HighScores), exit_high_scores);
        app.add_systems(OnEnter(AppState::NameEntry), enter_name_entry);
        app.add_systems(OnExit(AppState::NameEntry), exit_name_entry);
        app.add_systems(
            Update,
            (
                leave_high_scores.run_if(in_state(AppState::HighScores)),
                (type_name, show_typed_name).run_if(in_state(AppState::NameEntry)),
            ),
        );
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Entry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub score: u32,
}

/// The ten best runs, highest first.
#[derive(Resource, Serialize, Deserialize)]
pub struct HighScoreTable {
    pub entries: Vec<Entry>,
}

impl Default for HighScoreTable {
    // Factory scores, beatable from the very first game.
    fn default() -> Self {
        let mut entries: Vec<Entry> = (1..=TABLE_SIZE)
            .map(|rank| {
                let (name, level) = if rank % 2 == 0 {
                    ("Freddy", rank / 2)
                } else {
                    ("BBB", (rank + 1) / 2)
                };
                Entry {
                    name: name.to_string(),
                    level,
                    score: rank as u32 * 5000,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        HighScoreTable { entries }
    }
}

impl HighScoreTable {
    pub fn qualifies(&self, score: u32) -> bool {
        score > 0
            && (self.entries.len() < TABLE_SIZE
                || self.entries.last().is_none_or(|last| score > last.score))
    }

    /// Places the entry in score order and returns its rank, dropping
    /// whatever falls off the bottom.
    pub fn insert(&mut self, entry: Entry) -> usize {
        let rank = self
            .entries
            .iter()
            .position(|existing| entry.score > existing.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(rank, entry);
        self.entries.truncate(TABLE_SIZE);
        rank
    }
}

/// A trimmed name between 1 and 15 characters is accepted. Counted in
/// characters, not bytes, to agree with the typing limit.
pub fn valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    (1..=MAX_NAME_LENGTH).contains(&trimmed.chars().count())
}

// ── Persistence ──────────────────────────────────────────────────────────────

fn table_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("paranoid").join("high_scores.ron"))
}

fn load_high_scores(mut commands: Commands) {
    let Some(path) = table_path() else {
        error!("no platform data directory; high scores will not persist");
        commands.init_resource::<HighScoreTable>();
        return;
    };

    let table = match fs::read_to_string(&path) {
        Ok(contents) => match ron::from_str::<HighScoreTable>(&contents) {
            Ok(table) => {
                info!("loaded high scores from {}", path.display());
                table
            }
            Err(err) => {
                error!("could not parse {}: {err}", path.display());
                HighScoreTable::default()
            }
        },
        Err(_) => {
            info!("no high score file yet, starting fresh");
            HighScoreTable::default()
        }
    };
    commands.insert_resource(table);
}

pub fn save_high_scores(table: &HighScoreTable) {
    let Some(path) = table_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            error!("could not create {}: {err}", parent.display());
            return;
        }
    }
    match ron::ser::to_string_pretty(table, PrettyConfig::default()) {
        Ok(serialized) => {
            if let Err(err) = fs::write(&path, serialized) {
                error!("could not write {}: {err}", path.display());
            }
        }
        Err(err) => error!("could not serialize high scores: {err}"),
    }
}

// ── Leader board screen ──────────────────────────────────────────────────────

/// Present when the player has just taken first place; cleared after the
/// leader board celebrates it.
#[derive(Resource)]
pub struct NewHighScore;

#[derive(Component, Clone, Copy)]
struct HighScoresScreen;

fn enter_high_scores(
    table: Res<HighScoreTable>,
    session: Res<Session>,
    fonts: Res<Fonts>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    new_high_score: Option<Res<NewHighScore>>,
    mut commands: Commands,
) {
    let boundary = Boundary::fullscreen();
    commands.insert_resource(boundary);

    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/fullscreen_boundary_black_background.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
        HighScoresScreen,
    ));
    ball::spawn_random_balls(&mut commands, &asset_server, &boundary, HighScoresScreen);
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/leader_board_brick.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, 760.0, 1.0),
        HighScoresScreen,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/high_scores_brick.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, 680.0, 1.0),
        HighScoresScreen,
    ));

    let header = |text: &'static str, x: f32, anchor: Anchor| {
        (
            Text2d::new(text),
            TextFont {
                font: fonts.medium.clone(),
                font_size: 40.0,
                ..default()
            },
            TextColor(HEADING_COLOR),
            anchor,
            Transform::from_xyz(x, 590.0, 1.0),
            HighScoresScreen,
        )
    };
    commands.spawn(header("Name", 420.0, Anchor::CENTER_LEFT));
    commands.spawn(header("Level", SCREEN_WIDTH / 2.0, Anchor::CENTER));
    commands.spawn(header("Score", 1116.0, Anchor::CENTER_RIGHT));

    // The freshly entered run is picked out in green.
    for (rank, entry) in table.entries.iter().enumerate() {
        let y = 540.0 - 45.0 * rank as f32;
        let color = if new_high_score.is_some()
            && entry.score == session.score
            && entry.level == session.level_number
        {
            HIGHLIGHT_COLOR
        } else {
            ROW_COLOR
        };
        let row = |text: String, x: f32, anchor: Anchor| {
            (
                Text2d::new(text),
                TextFont {
                    font: fonts.light.clone(),
                    font_size: 32.0,
                    ..default()
                },
                TextColor(color),
                anchor,
                Transform::from_xyz(x, y, 1.0),
                HighScoresScreen,
            )
        };
        commands.spawn(row(entry.name.clone(), 420.0, Anchor::CENTER_LEFT));
        commands.spawn(row(
            entry.level.to_string(),
            SCREEN_WIDTH / 2.0,
            Anchor::CENTER,
        ));
        commands.spawn(row(
            crate::hud::thousands(entry.score),
            1116.0,
            Anchor::CENTER_RIGHT,
        ));
    }

    if new_high_score.is_some() {
        play_sfx(&mut commands, &audio.high_score_voice);
        commands.remove_resource::<NewHighScore>();
    }
    commands.trigger(StartMusic {
        track: audio.high_scores_music.clone(),
        volume: MUSIC_VOLUME_LOW,
    });
}

fn leave_high_scores(
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    if keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Escape) {
        play_sfx(&mut commands, &audio.whoosh);
        next_state.set(AppState::MainMenu);
    }
}

fn exit_high_scores(screen: Query<Entity, With<HighScoresScreen>>, mut commands: Commands) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
    commands.trigger(StopMusic);
}

// ── Name entry screen ────────────────────────────────────────────────────────

#[derive(Resource, Default)]
struct NameBuffer(String);

#[derive(Component)]
struct NameEntryScreen;

#[derive(Component)]
struct TypedNameText;

fn enter_name_entry(
    fonts: Res<Fonts>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    let boundary = Boundary::fullscreen();
    commands.insert_resource(boundary);
    commands.init_resource::<NameBuffer>();

    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/fullscreen_boundary_black_background.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
        NameEntryScreen,
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/confirmation_dialogue_boundary.png"),
            ..default()
        },
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 1.0),
        NameEntryScreen,
    ));
    commands.spawn((
        Text2d::new("New high score! Enter your name"),
        TextFont {
            font: fonts.medium.clone(),
            font_size: 40.0,
            ..default()
        },
        TextColor(HEADING_COLOR),
        Transform::from_xyz(boundary.center_x(), boundary.center_y() + 90.0, 2.0),
        NameEntryScreen,
    ));
    commands.spawn((
        Text2d::new(""),
        TextFont {
            font: fonts.light.clone(),
            font_size: 40.0,
            ..default()
        },
        TextColor(ROW_COLOR),
        Transform::from_xyz(boundary.center_x(), boundary.center_y(), 2.0),
        TypedNameText,
        NameEntryScreen,
    ));
    commands.spawn((
        Text2d::new("Max: 15 characters"),
        TextFont {
            font: fonts.light.clone(),
            font_size: 25.0,
            ..default()
        },
        TextColor(ROW_COLOR),
        Transform::from_xyz(boundary.center_x(), boundary.center_y() - 80.0, 2.0),
        NameEntryScreen,
    ));
}

fn type_name(
    mut keyboard: MessageReader<KeyboardInput>,
    audio: Res<GameAudio>,
    session: Res<Session>,
    mut buffer: ResMut<NameBuffer>,
    mut table: ResMut<HighScoreTable>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    for event in keyboard.read() {
        if !event.state.is_pressed() {
            continue;
        }
        match &event.logical_key {
            Key::Character(typed) => {
                if buffer.0.chars().count() < MAX_NAME_LENGTH {
                    play_sfx(&mut commands, &audio.scroll_options);
                    buffer.0.push_str(typed);
                }
            }
            Key::Space => {
                if buffer.0.chars().count() < MAX_NAME_LENGTH {
                    play_sfx(&mut commands, &audio.scroll_options);
                    buffer.0.push(' ');
                }
            }
            Key::Backspace => {
                play_sfx(&mut commands, &audio.scroll_options);
                buffer.0.pop();
            }
            Key::Enter => {
                if !valid_name(&buffer.0) {
                    play_sfx(&mut commands, &audio.invalid_name_tone);
                    continue;
                }
                play_sfx(&mut commands, &audio.press_enter);
                let rank = table.insert(Entry {
                    name: buffer.0.trim().to_string(),
                    level: session.level_number,
                    score: session.score,
                });
                save_high_scores(&table);
                if rank == 0 {
                    commands.insert_resource(NewHighScore);
                }
                next_state.set(AppState::HighScores);
            }
            _ => {}
        }
    }
}

fn show_typed_name(
    buffer: Res<NameBuffer>,
    mut texts: Query<&mut Text2d, With<TypedNameText>>,
) {
    if let Ok(mut text) = texts.single_mut() {
        if text.0 != buffer.0 {
            text.0 = buffer.0.clone();
        }
    }
}

fn exit_name_entry(screen: Query<Entity, With<NameEntryScreen>>, mut commands: Commands) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<NameBuffer>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_sorted_and_full() {
        let table = HighScoreTable::default();
        assert_eq!(table.entries.len(), TABLE_SIZE);
        assert!(table
            .entries
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
        assert_eq!(table.entries[0].score, 50_000);
    }

    #[test]
    fn qualification_needs_beating_the_last_place() {
        let table = HighScoreTable::default();
        assert!(!table.qualifies(0));
        assert!(!table.qualifies(5000));
        assert!(table.qualifies(5001));
        assert!(table.qualifies(1_000_000));
    }

    #[test]
    fn insert_keeps_order_and_drops_the_bottom() {
        let mut table = HighScoreTable::default();
        let rank = table.insert(Entry {
            name: "Ada".to_string(),
            level: 3,
            score: 27_500,
        });
        assert_eq!(rank, 5);
        assert_eq!(table.entries.len(), TABLE_SIZE);
        assert_eq!(table.entries[5].name, "Ada");
        assert_eq!(table.entries.last().map(|entry| entry.score), Some(10_000));
    }

    #[test]
    fn first_place_gets_rank_zero() {
        let mut table = HighScoreTable::default();
        let rank = table.insert(Entry {
            name: "Grace".to_string(),
            level: 9,
            score: 99_999,
        });
        assert_eq!(rank, 0);
    }

    #[test]
    fn names_are_validated_trimmed() {
        assert!(valid_name("BBB"));
        assert!(valid_name("  spaced  "));
        assert!(!valid_name("   "));
        assert!(!valid_name(""));
        assert!(!valid_name("a name that goes on forever"));
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        // 15 two-byte characters; within the limit despite 30 bytes.
        let name = "å".repeat(MAX_NAME_LENGTH);
        assert!(valid_name(&name));
        assert!(!valid_name(&"å".repeat(MAX_NAME_LENGTH + 1)));
    }
}
