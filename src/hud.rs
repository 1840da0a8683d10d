use bevy::prelude::*;
use bevy::sprite::Anchor;

use crate::ball::{Ball, Magnetic};
use crate::layout::SCREEN_WIDTH;
use crate::level::{DemoMode, LevelPhase, LevelState, Phase};
use crate::paddle::Paddle;
use crate::session::Session;
use crate::{AppState, Fonts};

const PANEL_CENTER_X: f32 = (1140.0 + SCREEN_WIDTH - 10.0) / 2.0;
const VALUE_RIGHT_X: f32 = 1468.0;

const VALUE_COLOR: Color = Color::srgb_u8(215, 215, 215);
const LETTER_DIM: Color = Color::srgb_u8(170, 170, 170);
const LETTER_COLLECTED: Color = Color::srgb_u8(85, 255, 85);
const PROMPT_KEY_COLOR: Color = Color::srgb_u8(170, 0, 0);
const PROMPT_TEXT_COLOR: Color = Color::srgb_u8(0, 0, 170);

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (update_values, update_bonus_row, update_prompt)
                .run_if(in_state(AppState::Playing).and(resource_exists::<LevelPhase>)),
        );
    }
}

#[derive(Component)]
struct ScoreText;

#[derive(Component)]
struct LevelText;

#[derive(Component)]
struct LivesText;

#[derive(Component)]
struct BonusLetter(usize);

#[derive(Component)]
struct BonusTotalText;

#[derive(Component)]
struct PromptKeyText;

#[derive(Component)]
struct PromptHintText;

/// Builds the side panel: the labelled background image plus the live
/// text values laid over it. The demo variant swaps the background and
/// shows a big Demo watermark over the field instead of key prompts.
pub fn spawn_hud(
    commands: &mut Commands,
    asset_server: &AssetServer,
    fonts: &Fonts,
    demo: bool,
) {
    let background = if demo {
        "images/boundaries/demo_display_info_block.png"
    } else {
        "images/boundaries/display_info_block_black_background.png"
    };
    commands.spawn((
        Sprite {
            image: asset_server.load(background),
            ..default()
        },
        Transform::from_xyz(PANEL_CENTER_X, 432.0, 0.5),
        crate::level::LevelEntity,
    ));

    let value_font = TextFont {
        font: fonts.medium.clone(),
        font_size: 40.0,
        ..default()
    };

    let value = |y: f32| {
        (
            Text2d::new(""),
            value_font.clone(),
            TextColor(VALUE_COLOR),
            Anchor::CENTER_RIGHT,
            Transform::from_xyz(VALUE_RIGHT_X, y, 1.0),
            crate::level::LevelEntity,
        )
    };
    commands.spawn((value(730.0), ScoreText));
    commands.spawn((value(580.0), LevelText));
    commands.spawn((value(430.0), LivesText));

    for (index, letter) in "BONUS".chars().enumerate() {
        commands.spawn((
            Text2d::new(letter.to_string()),
            value_font.clone(),
            TextColor(LETTER_DIM),
            Transform::from_xyz(1248.0 + 50.0 * index as f32, 300.0, 1.0),
            BonusLetter(index),
            crate::level::LevelEntity,
        ));
    }
    commands.spawn((
        Text2d::new(""),
        value_font.clone(),
        TextColor(LETTER_COLLECTED),
        Anchor::CENTER_RIGHT,
        Transform::from_xyz(VALUE_RIGHT_X, 300.0, 1.0),
        Visibility::Hidden,
        BonusTotalText,
        crate::level::LevelEntity,
    ));

    if demo {
        commands.spawn((
            Text2d::new("Demo"),
            TextFont {
                font: fonts.light.clone(),
                font_size: 80.0,
                ..default()
            },
            TextColor(LETTER_DIM),
            Transform::from_xyz(575.0, 200.0, 0.6),
            crate::level::LevelEntity,
        ));
        return;
    }

    let prompt_font = TextFont {
        font: fonts.light.clone(),
        font_size: 30.0,
        ..default()
    };
    commands.spawn((
        Text2d::new("Press"),
        prompt_font.clone(),
        TextColor(PROMPT_TEXT_COLOR),
        Transform::from_xyz(PANEL_CENTER_X, 184.0, 1.0),
        crate::level::LevelEntity,
    ));
    commands.spawn((
        Text2d::new(""),
        prompt_font.clone(),
        TextColor(PROMPT_KEY_COLOR),
        Transform::from_xyz(PANEL_CENTER_X, 134.0, 1.0),
        PromptKeyText,
        crate::level::LevelEntity,
    ));
    commands.spawn((
        Text2d::new(""),
        prompt_font,
        TextColor(PROMPT_TEXT_COLOR),
        Transform::from_xyz(PANEL_CENTER_X, 84.0, 1.0),
        PromptHintText,
        crate::level::LevelEntity,
    ));
}

fn update_values(
    session: Res<Session>,
    mut texts: ParamSet<(
        Query<&mut Text2d, With<ScoreText>>,
        Query<&mut Text2d, With<LevelText>>,
        Query<&mut Text2d, With<LivesText>>,
    )>,
) {
    if let Ok(mut text) = texts.p0().single_mut() {
        text.0 = thousands(session.display_score);
    }
    if let Ok(mut text) = texts.p1().single_mut() {
        text.0 = session.level_number.to_string();
    }
    if let Ok(mut text) = texts.p2().single_mut() {
        text.0 = session.lives.to_string();
    }
}

/// Collected letters light up green; once the end-of-level bonus lands the
/// letters give way to the bonus amount.
fn update_bonus_row(
    state: Option<Res<LevelState>>,
    mut letters: Query<(&BonusLetter, &mut TextColor, &mut Visibility), Without<BonusTotalText>>,
    mut total: Query<(&mut Text2d, &mut Visibility), With<BonusTotalText>>,
) {
    let Some(state) = state else { return };

    for (letter, mut color, mut visibility) in letters.iter_mut() {
        let symbol = "BONUS".as_bytes()[letter.0] as char;
        color.0 = if state.bonus_order.contains(symbol) {
            LETTER_COLLECTED
        } else {
            LETTER_DIM
        };
        *visibility = if state.bonus_added {
            Visibility::Hidden
        } else {
            Visibility::Inherited
        };
    }

    if let Ok((mut text, mut visibility)) = total.single_mut() {
        if state.bonus_added {
            text.0 = thousands(state.bonus_score);
            *visibility = Visibility::Inherited;
        } else {
            *visibility = Visibility::Hidden;
        }
    }
}

fn update_prompt(
    phase: Res<LevelPhase>,
    demo: Option<Res<DemoMode>>,
    paddles: Query<&Paddle>,
    magnetic: Query<(), (With<Ball>, With<Magnetic>)>,
    mut keys: Query<&mut Text2d, (With<PromptKeyText>, Without<PromptHintText>)>,
    mut hints: Query<&mut Text2d, With<PromptHintText>>,
) {
    if demo.is_some() {
        return;
    }
    let (Ok(mut key), Ok(mut hint)) = (keys.single_mut(), hints.single_mut()) else {
        return;
    };

    let (key_text, hint_text) = match phase.kind {
        Phase::Ready => ("Space", "to start"),
        Phase::Active if !magnetic.is_empty() => ("Space", "to release"),
        Phase::Active if paddles.single().is_ok_and(|paddle| paddle.shooter) => {
            ("Space", "to shoot")
        }
        Phase::Active => ("Esc", "to pause"),
        _ => ("", ""),
    };
    key.0 = key_text.to_string();
    hint.0 = hint_text.to_string();
}

/// Formats a score with thousands separators.
pub fn thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }
}
