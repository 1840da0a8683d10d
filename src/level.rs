use bevy::prelude::*;
use rand::seq::IteratorRandom;
use std::collections::HashMap;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME_LOW};
use crate::ball::{self, Ball, Decorative, Magnetic, ReleaseBalls};
use crate::brick::{self, Breakable, Brick, BrickKind};
use crate::bullet::{Bullet, FireBullet};
use crate::high_scores::HighScoreTable;
use crate::hud;
use crate::icon::{FallingIcon, IconKind};
use crate::layout::{
    Boundary, BRICK_HEIGHT, BRICK_MARGIN, BRICK_WIDTH, COLUMNS, SCREEN_HEIGHT, SCREEN_PADDING,
};
use crate::menu::ConfirmDialog;
use crate::paddle::{self, Paddle};
use crate::pause::Paused;
use crate::session::Session;
use crate::transitions::{CameraTransition, TransitionFinished, TransitionKind};
use crate::{AppState, Fonts};

pub const PAUSE_TIME: f32 = 3.0;
pub const TRANSITION_TIME: f32 = 1.0;
pub const DEMO_LEVEL_TIME: f32 = 12.0;

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_build_level);
        app.add_observer(on_teardown_level);
        app.add_observer(on_complete_level);
        app.add_observer(on_transition_finished);
        app.add_systems(
            Update,
            (
                tick_phase.run_if(level_unobstructed),
                handle_space
                    .run_if(level_unobstructed.and(not(resource_exists::<DemoMode>))),
                run_demo.run_if(resource_exists::<DemoMode>),
                (check_level_complete, check_balls_lost).run_if(gameplay_running),
                progress_life_lost.run_if(level_unobstructed),
                progress_complete.run_if(level_unobstructed),
                progress_game_over.run_if(level_unobstructed),
            )
                .run_if(in_state(AppState::Playing).and(resource_exists::<LevelPhase>)),
        );
    }
}

/// Static description of a level: a 14-column brick grid plus the icons
/// hidden in its breakable bricks. Rows are written as rows of 4-letter
/// tokens so the layout stays readable; `----` is an empty cell.
pub struct LevelSpec {
    pub grid: &'static [&'static str],
    pub icons: &'static [IconKind],
}

use IconKind::{
    BonusScore as SCORE, ExtraLife as LIFE, InvincibleBall as INVINCIBLE, Lengthen as LENGTHEN,
    Magnet as MAGNET, SafetyBarrier as SAFETY, Shooter as SHOOT, Shorten as SHORTEN,
    SlowDown as SLOW, SpeedUp as SPEED, Split as SPLIT,
};

pub static CAMPAIGN: &[LevelSpec] = &[
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- KNYA UK__ ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- UK__ KNYA ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_",
            "BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE",
            "GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_",
            "AQUA AQUA AQUA AQUA AQUA AQUA PINK PINK AQUA AQUA AQUA AQUA AQUA AQUA",
        ],
        icons: &[MAGNET, SHORTEN, SAFETY, LENGTHEN, SPEED],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE ----",
            "---- RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ ----",
            "---- GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ GRN_ ----",
            "---- AQUA AQUA AQUA AQUA AQUA AQUA AQUA AQUA AQUA AQUA AQUA AQUA ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- AQUL AQUL AQUL AQUL AQUL AQUL AQUL AQUL AQUL AQUL AQUL AQUL ----",
            "---- GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL ----",
            "---- REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL ----",
            "---- BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL ----",
        ],
        icons: &[SPEED, SPLIT, SPLIT, SHOOT, SLOW, SCORE, LIFE],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL REDL",
            "---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL BLUL",
            "SAD_ ---- SAD_ ---- SAD_ ---- SAD_ ---- SAD_ ---- SAD_ ---- SAD_ ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL GRNL",
            "---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY ---- HAPY",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- PINK PINK ---- ---- ---- ---- ---- ----",
        ],
        icons: &[SHOOT, LIFE, INVINCIBLE, SCORE, LENGTHEN],
    },
    LevelSpec {
        grid: &[
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- AQUL GRNL ---- ---- ---- REDL BLUL ----",
            "---- BLUL REDL ---- ---- ---- GRNL AQUL ---- ---- ---- REDL BLUL ----",
        ],
        icons: &[SAFETY, SHORTEN, MAGNET, SPLIT, LENGTHEN, SHOOT, SCORE],
    },
    LevelSpec {
        grid: &[
            "BLUE BLUE BLUE BLUE BLUE ---- ---- ---- ---- BLUE BLUE BLUE BLUE BLUE",
            "BLUE RED_ RED_ RED_ ---- ---- ---- ---- ---- ---- RED_ RED_ RED_ BLUE",
            "BLUE GRN_ GRN_ ---- ---- ---- ---- ---- ---- ---- ---- GRN_ GRN_ BLUE",
            "BLUE RED_ ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- RED_ BLUE",
            "BLUE ---- ---- ---- ---- ---- MUL4 ---- ---- ---- ---- ---- ---- BLUE",
            "---- ---- ---- ---- ---- ---- ---- MUL4 ---- ---- ---- ---- ---- ----",
            "BLUE ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- BLUE",
            "BLUE RED_ ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- RED_ BLUE",
            "BLUE GRN_ GRN_ ---- ---- ---- ---- ---- ---- ---- ---- GRN_ GRN_ BLUE",
            "BLUE RED_ RED_ RED_ ---- ---- ---- ---- ---- ---- RED_ RED_ RED_ BLUE",
            "BLUE BLUE BLUE BLUE BLUE ---- ---- ---- ---- BLUE BLUE BLUE BLUE BLUE",
        ],
        icons: &[MAGNET, SCORE, MAGNET, SCORE, SHOOT, LIFE],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- MUL2 MUL2 ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- REDB REDB ---- ---- ---- ---- ---- ----",
            "RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "GREY GRN_ GREY GRN_ GREY GRN_ GREY GREY GRN_ GREY GRN_ GREY GRN_ GREY",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- RGRY RGRY ---- ---- ---- ---- ---- ---- LGRY LGRY ---- ----",
            "---- ---- RGRY RGRY ---- ---- ---- ---- ---- ---- LGRY LGRY ---- ----",
        ],
        icons: &[SAFETY, SHORTEN, SPLIT, LENGTHEN, LIFE, SPEED, SPLIT, SHORTEN, SCORE],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- HAPY HAPY ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- HAPY ---- ---- HAPY ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE BLUE",
            "---- RED_ ---- RED_ ---- RED_ ---- ---- RED_ ---- RED_ ---- RED_ ----",
            "---- ---- ---- ---- ---- ---- PINK UK__ ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- KNYA PINK ---- ---- ---- ---- ---- ----",
            "BLUE ---- BLUE ---- BLUE ---- BLUE BLUE ---- BLUE ---- BLUE ---- BLUE",
            "RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_ RED_",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- SAD_ ---- ---- SAD_ ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- SAD_ SAD_ ---- ---- ---- ---- ---- ----",
        ],
        icons: &[INVINCIBLE, LENGTHEN, SCORE, SAFETY, SHORTEN, SPEED, SHOOT],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- HAPY SAD_ ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "GREY ---- GREY ---- GREY ---- GREY ---- GREY ---- GREY ---- GREY ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "BLOK PINK BLOK PINK BLOK PINK BLOK PINK BLOK PINK BLOK PINK BLOK PINK",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK BLUL BLOK REDL BLOK BLUL BLOK REDL BLOK BLUL BLOK REDL BLOK BLUL",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
            "BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ---- BLOK ----",
        ],
        icons: &[LENGTHEN, MAGNET, SAFETY, SLOW, MAGNET, LENGTHEN, LIFE, LIFE],
    },
    LevelSpec {
        grid: &[
            "---- ---- ---- ---- REDB ---- BONB KNYA ---- REDB ---- ---- ---- ----",
            "AQUA ---- ---- PINK ---- ---- UK__ BONO ---- ---- PINK ---- ---- AQUA",
            "---- ---- REDB ---- ---- ---- BONN KNYA ---- ---- ---- REDB ---- ----",
            "AQUA ---- ---- PINK ---- ---- UK__ BONU ---- ---- PINK ---- ---- AQUA",
            "---- ---- ---- ---- RGRY ---- BONS KNYA ---- LGRY ---- ---- ---- ----",
            "AQUA ---- ---- ---- RGRY ---- ---- ---- ---- LGRY ---- ---- ---- AQUA",
            "---- ---- ---- ---- MUL4 RGRY MUL4 MUL4 LGRY MUL4 ---- ---- ---- ----",
            "AQUA ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- AQUA",
            "---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----",
            "BLUE BLUE ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- BLUE BLUE",
            "BLUE BLUE ---- ---- ---- MUL2 ---- ---- MUL2 ---- ---- ---- BLUE BLUE",
        ],
        icons: &[SLOW, SCORE, SPEED, SPLIT, LENGTHEN, LENGTHEN, LIFE],
    },
];

/// Parses grid rows into brick kinds, enforcing the 14-column shape.
pub fn parse_grid(rows: &[&str]) -> Result<Vec<Vec<Option<BrickKind>>>, String> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let cells: Vec<Option<BrickKind>> = row
                .split_whitespace()
                .map(|token| {
                    if token == "----" {
                        Ok(None)
                    } else {
                        BrickKind::from_token(token)
                            .map(Some)
                            .ok_or_else(|| format!("unknown brick token {token:?} in row {index}"))
                    }
                })
                .collect::<Result<_, String>>()?;
            if cells.len() != COLUMNS {
                return Err(format!(
                    "row {index} has {} columns, expected {COLUMNS}",
                    cells.len()
                ));
            }
            Ok(cells)
        })
        .collect()
}

// ── Level run state ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Waiting for Space before the ball launches.
    Ready,
    Active,
    LifeLost,
    Complete,
    GameOver,
}

#[derive(Resource)]
pub struct LevelPhase {
    pub kind: Phase,
    pub elapsed: f32,
}

impl LevelPhase {
    fn enter(&mut self, kind: Phase) {
        self.kind = kind;
        self.elapsed = 0.0;
    }
}

/// Per-level bookkeeping that resets on every build.
#[derive(Resource, Default)]
pub struct LevelState {
    /// BONUS letters in the order their bricks were broken.
    pub bonus_order: String,
    pub bonus_score: u32,
    pub bonus_added: bool,
    pub card_shown: bool,
    pub next_queued: bool,
    pub queued_at: f32,
    pub game_over_voiced: bool,
}

/// Present while the autopilot demo level is running.
#[derive(Resource, Default)]
pub struct DemoMode {
    pub elapsed: f32,
}

/// Everything spawned for the current level; torn down in one sweep.
#[derive(Component)]
pub struct LevelEntity;

/// Marks the center info card shown on level complete and game over.
#[derive(Component)]
pub struct InfoCard;

#[derive(Event)]
pub struct BuildLevel {
    pub number: usize,
    pub demo: bool,
}

#[derive(Event)]
pub struct TeardownLevel;

#[derive(Event)]
pub struct CompleteLevel;

// ── Run conditions ───────────────────────────────────────────────────────────

/// Gameplay systems run only while the level is live and nothing sits on
/// top of it.
pub fn gameplay_running(
    phase: Option<Res<LevelPhase>>,
    paused: Option<Res<Paused>>,
    dialog: Option<Res<ConfirmDialog>>,
    transition: Option<Res<CameraTransition>>,
) -> bool {
    phase.is_some_and(|phase| phase.kind == Phase::Active)
        && paused.is_none()
        && dialog.is_none()
        && transition.is_none()
}

/// Like `gameplay_running` but indifferent to the phase, for the flow
/// systems that drive the non-active phases.
pub fn level_unobstructed(
    paused: Option<Res<Paused>>,
    dialog: Option<Res<ConfirmDialog>>,
    transition: Option<Res<CameraTransition>>,
) -> bool {
    paused.is_none() && dialog.is_none() && transition.is_none()
}

// ── Build and teardown ───────────────────────────────────────────────────────

fn on_build_level(
    trigger: On<BuildLevel>,
    asset_server: Res<AssetServer>,
    audio: Res<GameAudio>,
    fonts: Res<Fonts>,
    mut session: ResMut<Session>,
    mut commands: Commands,
) {
    let number = trigger.number.clamp(1, CAMPAIGN.len());
    let spec = &CAMPAIGN[number - 1];
    let boundary = Boundary::playing_field();

    session.level_number = number;
    commands.insert_resource(boundary);
    commands.insert_resource(LevelState::default());
    commands.insert_resource(LevelPhase {
        kind: if trigger.demo { Phase::Active } else { Phase::Ready },
        elapsed: 0.0,
    });
    if trigger.demo {
        commands.insert_resource(DemoMode::default());
    }

    spawn_borders(&mut commands, &asset_server, &boundary);
    hud::spawn_hud(&mut commands, &asset_server, &fonts, trigger.demo);
    paddle::spawn_paddle(&mut commands, &asset_server, &boundary);
    ball::spawn_ball(&mut commands, &asset_server, &boundary);

    let grid = match parse_grid(spec.grid) {
        Ok(grid) => grid,
        Err(message) => {
            error!("level {number} grid is malformed: {message}");
            return;
        }
    };

    // Icons hide in randomly chosen breakable bricks.
    let mut rng = rand::thread_rng();
    let breakable_cells: Vec<(usize, usize)> = grid
        .iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                (*cell).filter(|kind| kind.breakable()).map(|_| (row, col))
            })
        })
        .collect();
    let hidden: HashMap<(usize, usize), IconKind> = breakable_cells
        .into_iter()
        .choose_multiple(&mut rng, spec.icons.len())
        .into_iter()
        .zip(spec.icons.iter().copied())
        .collect();

    for (row, cells) in grid.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let Some(kind) = cell else { continue };
            let mut brick = Brick::new(*kind);
            brick.hidden_icon = hidden.get(&(row, col)).copied();

            let x = boundary.inner_left
                + BRICK_MARGIN
                + (BRICK_MARGIN + BRICK_WIDTH) * col as f32
                + BRICK_WIDTH / 2.0;
            let y = boundary.inner_top
                - BRICK_MARGIN
                - BRICK_HEIGHT / 2.0
                - (BRICK_MARGIN + BRICK_HEIGHT) * row as f32;
            brick::spawn_brick(&mut commands, &asset_server, brick, Vec2::new(x, y));
        }
    }

    if trigger.demo {
        commands.trigger(StartMusic {
            track: audio.level_music[number - 1].clone(),
            volume: MUSIC_VOLUME_LOW,
        });
    } else {
        commands.insert_resource(CameraTransition::bounce_in(Some(number)));
    }
}

fn spawn_borders(commands: &mut Commands, asset_server: &AssetServer, boundary: &Boundary) {
    let height = SCREEN_HEIGHT - 2.0 * SCREEN_PADDING;
    let vertical = |x: f32, image: &str| {
        (
            Sprite {
                image: asset_server.load(image.to_owned()),
                custom_size: Some(Vec2::new(
                    boundary.inner_left - SCREEN_PADDING,
                    height,
                )),
                ..default()
            },
            Transform::from_xyz(x, boundary.center_y(), 0.5),
            LevelEntity,
        )
    };

    let thickness = boundary.inner_left - SCREEN_PADDING;
    commands.spawn(vertical(
        SCREEN_PADDING + thickness / 2.0,
        "images/boundaries/playing_field_left_vertical_border.png",
    ));
    commands.spawn(vertical(
        boundary.inner_right + thickness / 2.0,
        "images/boundaries/playing_field_right_vertical_border.png",
    ));
    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/playing_field_horizontal_border.png"),
            custom_size: Some(Vec2::new(
                boundary.inner_right + thickness - SCREEN_PADDING,
                thickness,
            )),
            ..default()
        },
        Transform::from_xyz(
            (SCREEN_PADDING + boundary.inner_right + thickness) / 2.0,
            boundary.inner_top + thickness / 2.0,
            0.5,
        ),
        LevelEntity,
    ));
}

fn on_teardown_level(
    _trigger: On<TeardownLevel>,
    entities: Query<Entity, With<LevelEntity>>,
    mut commands: Commands,
) {
    for entity in entities.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<LevelPhase>();
    commands.remove_resource::<LevelState>();
    commands.remove_resource::<DemoMode>();
    commands.trigger(StopMusic);
}

// ── Flow systems ─────────────────────────────────────────────────────────────

fn tick_phase(time: Res<Time>, phase: Option<ResMut<LevelPhase>>) {
    if let Some(mut phase) = phase {
        phase.elapsed += time.delta_secs();
    }
}

fn handle_space(
    keys: Res<ButtonInput<KeyCode>>,
    mut phase: ResMut<LevelPhase>,
    paddles: Query<&Paddle>,
    magnetic: Query<(), (With<Ball>, With<Magnetic>)>,
    mut commands: Commands,
) {
    if !keys.just_pressed(KeyCode::Space) {
        return;
    }

    match phase.kind {
        Phase::Ready => phase.enter(Phase::Active),
        Phase::Active => {
            if !magnetic.is_empty() {
                commands.trigger(ReleaseBalls);
            } else if paddles.single().is_ok_and(|paddle| paddle.shooter) {
                commands.trigger(FireBullet);
            }
        }
        _ => {}
    }
}

/// The demo ends on any key press or after its fixed run time.
fn run_demo(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut demo: ResMut<DemoMode>,
    audio: Res<GameAudio>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    demo.elapsed += time.delta_secs();
    if demo.elapsed >= DEMO_LEVEL_TIME || keys.get_just_pressed().next().is_some() {
        play_sfx(&mut commands, &audio.whoosh);
        commands.trigger(TeardownLevel);
        next_state.set(AppState::MainMenu);
    }
}

fn check_level_complete(remaining: Query<(), With<Breakable>>, mut commands: Commands) {
    if remaining.is_empty() {
        commands.trigger(CompleteLevel);
    }
}

fn check_balls_lost(
    balls: Query<(), (With<Ball>, Without<Decorative>)>,
    demo: Option<Res<DemoMode>>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    mut session: ResMut<Session>,
    mut phase: ResMut<LevelPhase>,
    mut commands: Commands,
) {
    if !balls.is_empty() {
        return;
    }

    if demo.is_some() {
        ball::spawn_ball(&mut commands, &asset_server, &boundary);
        return;
    }

    session.lives = session.lives.saturating_sub(1);
    play_sfx(&mut commands, &audio.lose_life);
    commands.trigger(StopMusic);
    if session.lives == 0 {
        phase.enter(Phase::GameOver);
    } else {
        phase.enter(Phase::LifeLost);
    }
}

/// A fresh paddle and parked ball arrive after the lose-life pause.
fn progress_life_lost(
    phase: Option<ResMut<LevelPhase>>,
    session: Res<Session>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    old_paddles: Query<Entity, With<Paddle>>,
    leftovers: Query<Entity, Or<(With<Bullet>, With<FallingIcon>)>>,
    mut commands: Commands,
) {
    let Some(mut phase) = phase else { return };
    if phase.kind != Phase::LifeLost || phase.elapsed <= PAUSE_TIME + TRANSITION_TIME {
        return;
    }

    for entity in old_paddles.iter().chain(leftovers.iter()) {
        commands.entity(entity).despawn();
    }
    paddle::spawn_paddle(&mut commands, &asset_server, &boundary);
    ball::spawn_ball(&mut commands, &asset_server, &boundary);
    phase.enter(Phase::Ready);
    commands.trigger(StartMusic {
        track: audio.level_music[session.level_number - 1].clone(),
        volume: MUSIC_VOLUME_LOW,
    });
}

fn on_complete_level(
    _trigger: On<CompleteLevel>,
    phase: Option<ResMut<LevelPhase>>,
    demo: Option<Res<DemoMode>>,
    audio: Res<GameAudio>,
    leftovers: Query<Entity, Or<(With<Bullet>, With<FallingIcon>, With<Ball>)>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    let Some(mut phase) = phase else { return };
    if matches!(phase.kind, Phase::Complete | Phase::GameOver) {
        return;
    }

    if demo.is_some() {
        commands.trigger(TeardownLevel);
        next_state.set(AppState::MainMenu);
        return;
    }

    phase.enter(Phase::Complete);
    play_sfx(&mut commands, &audio.level_complete_sound);
    commands.trigger(StopMusic);
    for entity in leftovers.iter() {
        commands.entity(entity).despawn();
    }
}

fn progress_complete(
    phase: Option<Res<LevelPhase>>,
    state: Option<ResMut<LevelState>>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    fonts: Res<Fonts>,
    table: Res<HighScoreTable>,
    mut session: ResMut<Session>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    let Some(phase) = phase else { return };
    let Some(mut state) = state else { return };
    if phase.kind != Phase::Complete {
        return;
    }

    if phase.elapsed > PAUSE_TIME && !state.bonus_added {
        state.bonus_score = bonus_total(&state.bonus_order, session.lives);
        session.score += state.bonus_score;
        state.bonus_added = true;

        let tier = if state.bonus_score <= 1500 {
            &audio.adding_bonus_1
        } else if state.bonus_score <= 3500 {
            &audio.adding_bonus_2
        } else {
            &audio.adding_bonus_3
        };
        play_sfx(&mut commands, tier);
        play_sfx(&mut commands, &audio.level_complete_voice);

        spawn_card(
            &mut commands,
            &asset_server,
            &fonts,
            &boundary,
            &format!("Level {} Complete!", session.level_number),
        );
    }

    // Wait for the score ticker to catch up before queueing the outro.
    if state.bonus_added
        && !state.next_queued
        && phase.elapsed > PAUSE_TIME + TRANSITION_TIME
        && session.display_score == session.score
    {
        state.next_queued = true;
        state.queued_at = phase.elapsed;
    }

    if state.next_queued && phase.elapsed > state.queued_at + PAUSE_TIME - TRANSITION_TIME {
        state.next_queued = false;
        if session.level_number < CAMPAIGN.len() {
            commands
                .insert_resource(CameraTransition::slide_out(Some(session.level_number + 1)));
            play_sfx(&mut commands, &audio.level_up);
        } else {
            // Campaign finished; hand over to the leader board.
            commands.trigger(TeardownLevel);
            play_sfx(&mut commands, &audio.whoosh);
            if table.qualifies(session.score) {
                next_state.set(AppState::NameEntry);
            } else {
                next_state.set(AppState::HighScores);
            }
        }
    }
}

fn progress_game_over(
    phase: Option<Res<LevelPhase>>,
    state: Option<ResMut<LevelState>>,
    boundary: Res<Boundary>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    fonts: Res<Fonts>,
    table: Res<HighScoreTable>,
    session: Res<Session>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    let Some(phase) = phase else { return };
    let Some(mut state) = state else { return };
    if phase.kind != Phase::GameOver {
        return;
    }

    if phase.elapsed > PAUSE_TIME + TRANSITION_TIME && !state.game_over_voiced {
        state.game_over_voiced = true;
        play_sfx(&mut commands, &audio.game_over_voice);
        spawn_card(&mut commands, &asset_server, &fonts, &boundary, "Game Over");
    }

    if state.game_over_voiced
        && phase.elapsed > PAUSE_TIME + TRANSITION_TIME + PAUSE_TIME
        && session.display_score == session.score
    {
        commands.trigger(TeardownLevel);
        play_sfx(&mut commands, &audio.whoosh);
        if table.qualifies(session.score) {
            next_state.set(AppState::NameEntry);
        } else {
            next_state.set(AppState::HighScores);
        }
    }
}

fn spawn_card(
    commands: &mut Commands,
    asset_server: &AssetServer,
    fonts: &Fonts,
    boundary: &Boundary,
    message: &str,
) {
    commands
        .spawn((
            Sprite {
                image: asset_server.load("images/boundaries/level_info_boundary.png"),
                ..default()
            },
            Transform::from_xyz(boundary.center_x(), boundary.center_y(), 5.0),
            InfoCard,
            LevelEntity,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text2d::new(message),
                TextFont {
                    font: fonts.medium.clone(),
                    font_size: 60.0,
                    ..default()
                },
                TextColor(Color::srgb_u8(255, 85, 85)),
                Transform::from_xyz(0.0, 0.0, 0.1),
            ));
        });
}

/// End-of-level bonus: a perfect in-order BONUS collection is worth 5000,
/// any-order collection 2000, plus 100 per remaining life.
pub fn bonus_total(order: &str, lives: u32) -> u32 {
    let letters = if order == "BONUS" {
        5000
    } else if order.len() == 5 {
        2000
    } else {
        0
    };
    letters + lives * 100
}

fn on_transition_finished(
    trigger: On<TransitionFinished>,
    state: Res<State<AppState>>,
    phase: Option<Res<LevelPhase>>,
    demo: Option<Res<DemoMode>>,
    session: Res<Session>,
    audio: Res<GameAudio>,
    mut commands: Commands,
) {
    match trigger.kind {
        TransitionKind::BounceIn => {
            if *state.get() == AppState::Playing && phase.is_some() && demo.is_none() {
                commands.trigger(StartMusic {
                    track: audio.level_music[session.level_number - 1].clone(),
                    volume: MUSIC_VOLUME_LOW,
                });
            }
        }
        TransitionKind::SlideOut => {
            if let Some(next) = trigger.level {
                commands.trigger(TeardownLevel);
                commands.trigger(BuildLevel {
                    number: next,
                    demo: false,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_campaign_grid_parses() {
        for (index, spec) in CAMPAIGN.iter().enumerate() {
            let grid = parse_grid(spec.grid)
                .unwrap_or_else(|message| panic!("level {}: {message}", index + 1));
            assert!(!grid.is_empty());
            assert!(grid.iter().all(|row| row.len() == COLUMNS));
        }
    }

    #[test]
    fn every_campaign_level_has_room_for_its_icons() {
        for (index, spec) in CAMPAIGN.iter().enumerate() {
            let grid = parse_grid(spec.grid).unwrap();
            let breakable = grid
                .iter()
                .flatten()
                .filter(|cell| cell.is_some_and(|kind| kind.breakable()))
                .count();
            assert!(
                breakable >= spec.icons.len(),
                "level {} has {} breakable bricks for {} icons",
                index + 1,
                breakable,
                spec.icons.len()
            );
        }
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(parse_grid(&["RED_ BLUE"]).is_err());
        assert!(parse_grid(&[
            "WHAT ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ----"
        ])
        .is_err());
    }

    #[test]
    fn bonus_rewards_order_then_completeness() {
        assert_eq!(bonus_total("BONUS", 0), 5000);
        assert_eq!(bonus_total("BOUNS", 0), 2000);
        assert_eq!(bonus_total("BON", 0), 0);
        assert_eq!(bonus_total("", 3), 300);
        assert_eq!(bonus_total("BONUS", 2), 5200);
    }
}