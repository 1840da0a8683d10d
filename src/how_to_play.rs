use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio, StartMusic, StopMusic, MUSIC_VOLUME};
use crate::brick::BrickKind;
use crate::icon::{self, IconKind};
use crate::layout::{Boundary, BRICK_HEIGHT, BRICK_WIDTH, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::level::LevelEntity;
use crate::pause::Paused;
use crate::{AppState, Fonts};

const HEADING_COLOR: Color = Color::srgb_u8(255, 85, 85);
const BODY_COLOR: Color = Color::srgb_u8(215, 215, 215);
const NAV_COLOR: Color = Color::srgb_u8(85, 255, 255);

const PAGE_COUNT: usize = 4;

pub struct HowToPlayPlugin;

impl Plugin for HowToPlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::HowToPlay), enter_how_to_play);
        app.add_systems(OnExit(AppState::HowToPlay), exit_how_to_play);
        app.add_systems(
            Update,
            page_input.run_if(in_state(AppState::HowToPlay)),
        );
    }
}

/// Where the how-to-play screen hands control back to; it can be opened
/// both from the main menu and from the pause menu mid-level.
#[derive(Resource, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTo {
    MainMenu,
    Pause,
}

#[derive(Resource)]
struct Page(usize);

#[derive(Component)]
struct HowToPlayScreen;

#[derive(Component)]
struct PageContent;

fn enter_how_to_play(
    asset_server: Res<AssetServer>,
    fonts: Res<Fonts>,
    audio: Res<GameAudio>,
    mut level: Query<&mut Visibility, With<LevelEntity>>,
    mut commands: Commands,
) {
    commands.insert_resource(Boundary::fullscreen());
    commands.insert_resource(Page(0));

    // A paused level may still be alive underneath; keep it but take it
    // off screen until control goes back.
    for mut visibility in level.iter_mut() {
        *visibility = Visibility::Hidden;
    }

    commands.spawn((
        Sprite {
            image: asset_server.load("images/boundaries/fullscreen_boundary_black_background.png"),
            ..default()
        },
        Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT / 2.0, 0.0),
        HowToPlayScreen,
    ));
    spawn_page(0, &mut commands, &asset_server, &fonts);

    commands.trigger(StartMusic {
        track: audio.how_to_play_music.clone(),
        volume: MUSIC_VOLUME,
    });
}

fn exit_how_to_play(
    screen: Query<Entity, Or<(With<HowToPlayScreen>, With<PageContent>)>>,
    mut level: Query<&mut Visibility, With<LevelEntity>>,
    audio: Res<GameAudio>,
    mut commands: Commands,
) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
    for mut visibility in level.iter_mut() {
        *visibility = Visibility::Inherited;
    }
    commands.remove_resource::<Page>();
    commands.trigger(StopMusic);
    play_sfx(&mut commands, &audio.whoosh);
}

fn page_input(
    keys: Res<ButtonInput<KeyCode>>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    fonts: Res<Fonts>,
    return_to: Option<Res<ReturnTo>>,
    mut page: ResMut<Page>,
    content: Query<Entity, With<PageContent>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut commands: Commands,
) {
    let mut turn_to: Option<usize> = None;
    if keys.just_pressed(KeyCode::ArrowRight) {
        if page.0 + 1 < PAGE_COUNT {
            turn_to = Some(page.0 + 1);
        } else {
            play_sfx(&mut commands, &audio.no_next_item_tone);
        }
    } else if keys.just_pressed(KeyCode::ArrowLeft) {
        if page.0 > 0 {
            turn_to = Some(page.0 - 1);
        } else {
            play_sfx(&mut commands, &audio.no_next_item_tone);
        }
    }

    if let Some(next_page) = turn_to {
        page.0 = next_page;
        play_sfx(&mut commands, &audio.scroll_options);
        for entity in content.iter() {
            commands.entity(entity).despawn();
        }
        spawn_page(next_page, &mut commands, &asset_server, &fonts);
        return;
    }

    if keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Escape) {
        match return_to.as_deref() {
            Some(ReturnTo::Pause) => {
                if let Some(boundary) = boundary_on_return(ReturnTo::Pause) {
                    commands.insert_resource(boundary);
                }
                commands.insert_resource(Paused::default());
                commands.trigger(StartMusic {
                    track: audio.pause_menu_music.clone(),
                    volume: MUSIC_VOLUME,
                });
                next_state.set(AppState::Playing);
            }
            _ => next_state.set(AppState::MainMenu),
        }
        commands.remove_resource::<ReturnTo>();
    }
}

/// The level under a paused game uses the playing-field boundary; this
/// screen swapped in the fullscreen one, so hand the right one back.
fn boundary_on_return(target: ReturnTo) -> Option<Boundary> {
    match target {
        ReturnTo::Pause => Some(Boundary::playing_field()),
        ReturnTo::MainMenu => None,
    }
}

fn spawn_page(
    page: usize,
    commands: &mut Commands,
    asset_server: &AssetServer,
    fonts: &Fonts,
) {
    let heading = |text: &'static str| {
        (
            Text2d::new(text),
            TextFont {
                font: fonts.medium.clone(),
                font_size: 65.0,
                ..default()
            },
            TextColor(HEADING_COLOR),
            Transform::from_xyz(SCREEN_WIDTH / 2.0, SCREEN_HEIGHT - 110.0, 2.0),
            PageContent,
        )
    };
    let body = |text: &str, x: f32, y: f32, size: f32| {
        (
            Text2d::new(text),
            TextFont {
                font: fonts.light.clone(),
                font_size: size,
                ..default()
            },
            TextColor(BODY_COLOR),
            Transform::from_xyz(x, y, 2.0),
            PageContent,
        )
    };
    let nav = |text: &'static str, x: f32| {
        (
            Text2d::new(text),
            TextFont {
                font: fonts.medium.clone(),
                font_size: 35.0,
                ..default()
            },
            TextColor(NAV_COLOR),
            Transform::from_xyz(x, 100.0, 2.0),
            PageContent,
        )
    };

    match page {
        0 => {
            commands.spawn(heading("Instructions"));
            commands.spawn(body(
                "1. Break all the bricks to advance to the next level.\n\
                 Bonus score of 100 is added for every life.\n\n\
                 2. Move the paddle using the left and right arrow keys\n\
                 to prevent the ball from falling. If the ball falls, you\n\
                 lose a life.\n\n\
                 3. Control the direction of the ball based on which side\n\
                 it lands on the paddle. If it lands on the left, it will\n\
                 bounce to the left and vice versa. Also, the ball\n\
                 increases speed when it bounces farther away from the\n\
                 centre of the paddle.\n\n\
                 4. Collect icons that fall from the bricks to give your\n\
                 paddle special powers. However, if you lose a life,\n\
                 your paddle loses any special powers that it had.",
                SCREEN_WIDTH / 2.0,
                SCREEN_HEIGHT / 2.0,
                28.0,
            ));
            commands.spawn(nav("Next>", SCREEN_WIDTH - 200.0));
        }
        1 => {
            commands.spawn(heading("Bricks"));

            let mut brick_row = |kinds: &[BrickKind], y: f32| {
                for (index, kind) in kinds.iter().enumerate() {
                    commands.spawn((
                        Sprite {
                            image: asset_server.load(kind.images()[0]),
                            custom_size: Some(Vec2::new(BRICK_WIDTH, BRICK_HEIGHT)),
                            ..default()
                        },
                        Transform::from_xyz(200.0 + 95.0 * index as f32, y, 2.0),
                        PageContent,
                    ));
                }
            };
            use BrickKind::*;
            brick_row(&[Red, Blue, Green, Aqua, Grey], 664.0);
            brick_row(&[RedLine, BlueLine, GreenLine, AquaLine, GreyLine], 634.0);
            brick_row(&[Pink2, Pink1], 574.0);
            brick_row(&[RedBlue2, RedBlue1], 544.0);
            brick_row(&[Multi4, Multi3, Multi2, Multi1], 514.0);
            brick_row(&[UkFlag, Bbb, Smiling, RightGrey, Cup], 454.0);
            brick_row(&[KenyaFlag, Fnm, Frowning, LeftGrey], 424.0);
            brick_row(&[NormalWall], 364.0);
            brick_row(&[Unbreakable], 304.0);
            brick_row(&[BonusB, BonusO, BonusN, BonusU, BonusS], 244.0);

            commands.spawn(body(
                "These are normal bricks. The top\nrow score 100 each, the rest 150.",
                SCREEN_WIDTH - 450.0,
                649.0,
                26.0,
            ));
            commands.spawn(body(
                "Some bricks need to be hit more than\nonce to destroy them. Each hit earns\nyou 200 points.",
                SCREEN_WIDTH - 500.0,
                534.0,
                26.0,
            ));
            commands.spawn(body(
                "The ones with the pretty pictures\nare worth 250 points each.",
                SCREEN_WIDTH - 450.0,
                439.0,
                26.0,
            ));
            commands.spawn(body(
                "This type only gives you 50 points per hit.",
                710.0,
                364.0,
                26.0,
            ));
            commands.spawn(body(
                "No amount of battering can break this block.",
                740.0,
                304.0,
                26.0,
            ));
            commands.spawn(body(
                "Collect these in the right order\nand earn 5,000 points! Otherwise,\nonly 2,000 extra.",
                SCREEN_WIDTH - 450.0,
                180.0,
                26.0,
            ));

            commands.spawn(nav("<Back", 200.0));
            commands.spawn(nav("Next>", SCREEN_WIDTH - 200.0));
        }
        2 => {
            commands.spawn(heading("Icons"));
            let column = [
                IconKind::Lengthen,
                IconKind::Shorten,
                IconKind::BonusScore,
                IconKind::Shooter,
                IconKind::Split,
                IconKind::Magnet,
            ];
            for (index, kind) in column.into_iter().enumerate() {
                icon::spawn_display(
                    commands,
                    asset_server,
                    kind,
                    Vec2::new(200.0, SCREEN_HEIGHT - 170.0 - 100.0 * index as f32),
                    PageContent,
                );
            }
            commands.spawn(body(
                "This icon increases the size of your paddle, allowing\n\
                 you to reach balls faster.\n\n\
                 If you are unfortunate enough to catch this icon,\n\
                 your paddle will shrink in size.\n\n\
                 Collect this icon to get 5,000 bonus points added\n\
                 to your score!\n\n\
                 This icon allows you to complete a level faster by\n\
                 shooting the bricks. Press SPACE to shoot.\n\n\
                 This icon splits into 2 the next three balls that hit\n\
                 your paddle.\n\n\
                 If you manage to capture this icon, your paddle will\n\
                 become magnetic, allowing you to reposition the ball.\n\
                 Press SPACE to release.",
                SCREEN_WIDTH / 2.0 + 50.0,
                SCREEN_HEIGHT / 2.0,
                26.0,
            ));
            commands.spawn(nav("<Back", 200.0));
            commands.spawn(nav("Next>", SCREEN_WIDTH - 200.0));
        }
        _ => {
            commands.spawn(heading("Icons"));
            let column = [
                IconKind::ExtraLife,
                IconKind::SafetyBarrier,
                IconKind::AdvanceLevel,
                IconKind::SpeedUp,
                IconKind::SlowDown,
                IconKind::InvincibleBall,
            ];
            for (index, kind) in column.into_iter().enumerate() {
                icon::spawn_display(
                    commands,
                    asset_server,
                    kind,
                    Vec2::new(200.0, SCREEN_HEIGHT - 170.0 - 100.0 * index as f32),
                    PageContent,
                );
            }
            commands.spawn(body(
                "A very useful icon to catch. This adds you an extra\n\
                 life in the game.\n\n\
                 This icon gives you a safety barrier that prevents\n\
                 the ball from falling - but only once.\n\n\
                 If the current level is too tricky for you, catch this\n\
                 icon to advance to the next level.\n\n\
                 All the balls will speed up if you are unfortunate\n\
                 enough to catch this icon.\n\n\
                 This helpful icon slows down all the balls to a more\n\
                 manageable speed.\n\n\
                 This cool icon makes the ball invincible for the next\n\
                 3 hits, allowing it to pass straight through the\n\
                 bricks - but only breakable ones.",
                SCREEN_WIDTH / 2.0 + 50.0,
                SCREEN_HEIGHT / 2.0,
                26.0,
            ));
            commands.spawn(nav("<Back", 200.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returning_to_a_paused_level_restores_the_field_boundary() {
        let restored = boundary_on_return(ReturnTo::Pause).unwrap();
        let field = Boundary::playing_field();
        assert_eq!(restored.inner_left, field.inner_left);
        assert_eq!(restored.inner_right, field.inner_right);
        assert!(!restored.reflects_bottom);
    }

    #[test]
    fn returning_to_the_main_menu_leaves_the_boundary_alone() {
        assert!(boundary_on_return(ReturnTo::MainMenu).is_none());
    }
}
