use bevy::prelude::*;

use crate::audio::{play_sfx, GameAudio};
use crate::ball::Ball;
use crate::bullet::Bullet;
use crate::icon::{self, IconKind};
use crate::layout::{overlaps, Hitbox, BRICK_HEIGHT, BRICK_WIDTH, PLAYING_FIELD_WIDTH};
use crate::level::{self, LevelEntity, LevelState};
use crate::session::Session;

pub struct BrickPlugin;

impl Plugin for BrickPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_damage_brick);
        app.add_systems(
            Update,
            release_hit_latch.run_if(level::gameplay_running),
        );
    }
}

/// All the brick varieties that can appear in a grid, plus the safety
/// barrier an icon can spawn at the bottom of the field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BrickKind {
    Red,
    Blue,
    Green,
    Aqua,
    Grey,
    RedLine,
    BlueLine,
    GreenLine,
    AquaLine,
    GreyLine,
    Pink2,
    Pink1,
    RedBlue2,
    RedBlue1,
    Multi4,
    Multi3,
    Multi2,
    Multi1,
    UkFlag,
    KenyaFlag,
    Cup,
    Bbb,
    Fnm,
    Smiling,
    Frowning,
    LeftGrey,
    RightGrey,
    NormalWall,
    RightWall,
    Unbreakable,
    BonusB,
    BonusO,
    BonusN,
    BonusU,
    BonusS,
    SafetyBarrier,
}

impl BrickKind {
    /// Grid token, four characters per cell.
    pub fn from_token(token: &str) -> Option<BrickKind> {
        use BrickKind::*;
        Some(match token {
            "RED_" => Red,
            "BLUE" => Blue,
            "GRN_" => Green,
            "AQUA" => Aqua,
            "GREY" => Grey,
            "REDL" => RedLine,
            "BLUL" => BlueLine,
            "GRNL" => GreenLine,
            "AQUL" => AquaLine,
            "GRYL" => GreyLine,
            "PINK" => Pink2,
            "PNK1" => Pink1,
            "REDB" => RedBlue2,
            "RDB1" => RedBlue1,
            "MUL4" => Multi4,
            "MUL3" => Multi3,
            "MUL2" => Multi2,
            "MUL1" => Multi1,
            "UK__" => UkFlag,
            "KNYA" => KenyaFlag,
            "CUP_" => Cup,
            "BBB_" => Bbb,
            "FNM_" => Fnm,
            "HAPY" => Smiling,
            "SAD_" => Frowning,
            "LGRY" => LeftGrey,
            "RGRY" => RightGrey,
            "NWAL" => NormalWall,
            "RWAL" => RightWall,
            "BLOK" => Unbreakable,
            "BONB" => BonusB,
            "BONO" => BonusO,
            "BONN" => BonusN,
            "BONU" => BonusU,
            "BONS" => BonusS,
            _ => return None,
        })
    }

    /// Texture stages from intact to most damaged. Multi-stage bricks
    /// step through the list one hit at a time.
    pub fn images(self) -> &'static [&'static str] {
        use BrickKind::*;
        match self {
            Red => &["images/bricks/red_brick.png"],
            Blue => &["images/bricks/blue_brick.png"],
            Green => &["images/bricks/green_brick.png"],
            Aqua => &["images/bricks/aqua_brick.png"],
            Grey => &["images/bricks/grey_brick.png"],
            RedLine => &["images/bricks/red_brick_with_line.png"],
            BlueLine => &["images/bricks/blue_brick_with_line.png"],
            GreenLine => &["images/bricks/green_brick_with_line.png"],
            AquaLine => &["images/bricks/aqua_brick_with_line.png"],
            GreyLine => &["images/bricks/grey_brick_with_line.png"],
            Pink2 => &[
                "images/bricks/pink_brick_1.png",
                "images/bricks/pink_brick_2.png",
            ],
            Pink1 => &["images/bricks/pink_brick_2.png"],
            RedBlue2 => &[
                "images/bricks/red_blue_brick_1.png",
                "images/bricks/red_blue_brick_2.png",
            ],
            RedBlue1 => &["images/bricks/red_blue_brick_2.png"],
            Multi4 => &[
                "images/bricks/multi_coloured_brick_1.png",
                "images/bricks/multi_coloured_brick_2.png",
                "images/bricks/multi_coloured_brick_3.png",
                "images/bricks/multi_coloured_brick_4.png",
            ],
            Multi3 => &[
                "images/bricks/multi_coloured_brick_2.png",
                "images/bricks/multi_coloured_brick_3.png",
                "images/bricks/multi_coloured_brick_4.png",
            ],
            Multi2 => &[
                "images/bricks/multi_coloured_brick_3.png",
                "images/bricks/multi_coloured_brick_4.png",
            ],
            Multi1 => &["images/bricks/multi_coloured_brick_4.png"],
            UkFlag => &["images/bricks/uk_flag_brick.png"],
            KenyaFlag => &["images/bricks/kenyan_flag_brick.png"],
            Cup => &["images/bricks/cup_brick.png"],
            Bbb => &["images/bricks/bbb_brick.png"],
            Fnm => &["images/bricks/fnm_brick.png"],
            Smiling => &["images/bricks/smiling_brick.png"],
            Frowning => &["images/bricks/frowning_brick.png"],
            LeftGrey => &["images/bricks/left_pointing_grey_brick.png"],
            RightGrey => &["images/bricks/right_pointing_grey_brick.png"],
            NormalWall => &["images/bricks/normal_wall_brick.png"],
            RightWall => &["images/bricks/right_wall_brick.png"],
            Unbreakable => &["images/bricks/unbreakable_brick.png"],
            BonusB => &["images/bricks/bonus_b_brick.png"],
            BonusO => &["images/bricks/bonus_o_brick.png"],
            BonusN => &["images/bricks/bonus_n_brick.png"],
            BonusU => &["images/bricks/bonus_u_brick.png"],
            BonusS => &["images/bricks/bonus_s_brick.png"],
            SafetyBarrier => &[],
        }
    }

    /// Score for each hit that lands on the brick.
    pub fn score(self) -> u32 {
        use BrickKind::*;
        match self {
            Red | Blue | Green | Aqua | Grey => 100,
            RedLine | BlueLine | GreenLine | AquaLine | GreyLine => 150,
            Pink2 | Pink1 | RedBlue2 | RedBlue1 | Multi4 | Multi3 | Multi2 | Multi1 => 200,
            UkFlag | KenyaFlag | Cup | Bbb | Fnm | Smiling | Frowning | LeftGrey | RightGrey => 250,
            NormalWall | RightWall => 50,
            BonusB | BonusO | BonusN | BonusU | BonusS => 100,
            Unbreakable | SafetyBarrier => 0,
        }
    }

    pub fn letter(self) -> Option<char> {
        use BrickKind::*;
        match self {
            BonusB => Some('B'),
            BonusO => Some('O'),
            BonusN => Some('N'),
            BonusU => Some('U'),
            BonusS => Some('S'),
            _ => None,
        }
    }

    pub fn breakable(self) -> bool {
        self != BrickKind::Unbreakable
    }

    pub fn is_barrier(self) -> bool {
        self == BrickKind::SafetyBarrier
    }

    fn is_bonus_letter(self) -> bool {
        self.letter().is_some()
    }
}

#[derive(Component)]
pub struct Brick {
    pub kind: BrickKind,
    /// Index into `kind.images()`; past the end means destroyed.
    pub stage: usize,
    /// A brick takes at most one hit per contact episode. Cleared once
    /// nothing overlaps it anymore.
    pub been_hit: bool,
    /// Power-up hidden inside the brick, released when it breaks.
    pub hidden_icon: Option<IconKind>,
}

impl Brick {
    pub fn new(kind: BrickKind) -> Self {
        Brick {
            kind,
            stage: 0,
            been_hit: false,
            hidden_icon: None,
        }
    }
}

/// Grid bricks that count toward level completion. The safety barrier is
/// breakable but deliberately not tagged with this.
#[derive(Component)]
pub struct Breakable;

/// A ball or bullet has made contact with the brick.
#[derive(Event)]
pub struct DamageBrick {
    pub brick: Entity,
}

pub fn spawn_brick(
    commands: &mut Commands,
    asset_server: &AssetServer,
    brick: Brick,
    position: Vec2,
) -> Entity {
    let kind = brick.kind;
    let image = asset_server.load(kind.images()[0]);
    let mut entity = commands.spawn((
        Sprite {
            image,
            custom_size: Some(Vec2::new(BRICK_WIDTH, BRICK_HEIGHT)),
            ..default()
        },
        Transform::from_xyz(position.x, position.y, 1.0),
        Hitbox(Vec2::new(BRICK_WIDTH, BRICK_HEIGHT)),
        brick,
        LevelEntity,
    ));
    if kind.breakable() && !kind.is_barrier() {
        entity.insert(Breakable);
    }
    entity.id()
}

pub fn spawn_safety_barrier(commands: &mut Commands, boundary: &crate::layout::Boundary) {
    let size = Vec2::new(PLAYING_FIELD_WIDTH, 2.0);
    commands.spawn((
        Sprite::from_color(Color::WHITE, size),
        Transform::from_xyz(boundary.center_x(), boundary.inner_bottom + 7.0, 1.0),
        Hitbox(size),
        Brick::new(BrickKind::SafetyBarrier),
        LevelEntity,
    ));
}

/// Applies one hit to a brick: advance its texture stage or despawn it,
/// award score, record bonus letters and release the hidden icon.
fn on_damage_brick(
    trigger: On<DamageBrick>,
    mut bricks: Query<(&mut Brick, &mut Sprite, &Transform)>,
    mut session: ResMut<Session>,
    level_state: Option<ResMut<LevelState>>,
    audio: Res<GameAudio>,
    asset_server: Res<AssetServer>,
    mut commands: Commands,
) {
    let Ok((mut brick, mut sprite, transform)) = bricks.get_mut(trigger.brick) else {
        return;
    };

    if !brick.kind.breakable() {
        play_sfx(&mut commands, &audio.hit_unbreakable_brick);
        return;
    }
    if brick.been_hit {
        return;
    }
    brick.been_hit = true;
    brick.stage += 1;

    let images = brick.kind.images();
    if brick.stage < images.len() {
        sprite.image = asset_server.load(images[brick.stage]);
    } else {
        commands.entity(trigger.brick).despawn();

        if let Some(kind) = brick.hidden_icon.take() {
            icon::spawn_falling(
                &mut commands,
                &asset_server,
                kind,
                transform.translation.truncate(),
            );
        }
    }

    session.score += brick.kind.score();

    if let Some(letter) = brick.kind.letter() {
        if let Some(mut state) = level_state {
            state.bonus_order.push(letter);
        }
    }

    let hit_sound = if brick.kind.is_barrier() {
        &audio.hit_safety_barrier
    } else if brick.kind.is_bonus_letter() {
        &audio.hit_bonus_brick
    } else {
        &audio.hit_brick
    };
    play_sfx(&mut commands, hit_sound);
}

/// Re-arms bricks once nothing touches them, so a ball grinding along a
/// brick only scores a single hit per contact.
fn release_hit_latch(
    mut bricks: Query<(&mut Brick, &Transform, &Hitbox), Without<Ball>>,
    balls: Query<(&Transform, &Hitbox), (With<Ball>, Without<Brick>)>,
    bullets: Query<(&Transform, &Hitbox), (With<Bullet>, Without<Brick>)>,
) {
    for (mut brick, transform, hitbox) in bricks.iter_mut() {
        if !brick.been_hit {
            continue;
        }
        let center = transform.translation.truncate();
        let touched = balls
            .iter()
            .chain(bullets.iter())
            .any(|(t, h)| overlaps(center, hitbox.0, t.translation.truncate(), h.0));
        if !touched {
            brick.been_hit = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_to_kinds() {
        assert_eq!(BrickKind::from_token("RED_"), Some(BrickKind::Red));
        assert_eq!(BrickKind::from_token("BLOK"), Some(BrickKind::Unbreakable));
        assert_eq!(BrickKind::from_token("BONS"), Some(BrickKind::BonusS));
        assert_eq!(BrickKind::from_token("????"), None);
    }

    #[test]
    fn scores_match_brick_families() {
        assert_eq!(BrickKind::Red.score(), 100);
        assert_eq!(BrickKind::GreyLine.score(), 150);
        assert_eq!(BrickKind::Multi4.score(), 200);
        assert_eq!(BrickKind::Cup.score(), 250);
        assert_eq!(BrickKind::NormalWall.score(), 50);
        assert_eq!(BrickKind::Unbreakable.score(), 0);
    }

    #[test]
    fn multi_stage_bricks_have_one_image_per_hit() {
        assert_eq!(BrickKind::Pink2.images().len(), 2);
        assert_eq!(BrickKind::Multi4.images().len(), 4);
        assert_eq!(BrickKind::Multi1.images().len(), 1);
    }

    #[test]
    fn only_bonus_bricks_carry_letters() {
        assert_eq!(BrickKind::BonusB.letter(), Some('B'));
        assert_eq!(BrickKind::Red.letter(), None);
    }

    #[test]
    fn barrier_is_breakable_but_not_a_grid_brick() {
        assert!(BrickKind::SafetyBarrier.breakable());
        assert!(BrickKind::SafetyBarrier.is_barrier());
        assert!(!BrickKind::Unbreakable.breakable());
    }
}
