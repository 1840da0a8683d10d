use bevy::{audio::Volume, prelude::*};

pub const SFX_VOLUME: f32 = 0.3;
pub const MUSIC_VOLUME: f32 = 0.3;
pub const MUSIC_VOLUME_LOW: f32 = 0.1;

pub struct GameAudioPlugin;

impl Plugin for GameAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_audio);
        app.add_observer(on_start_music);
        app.add_observer(on_stop_music);
    }
}

/// Every sound effect and music track in the game, loaded up front.
/// Handle<T> is Bevy's way of referencing assets; loading happens in the
/// background and a handle becomes valid once loading completes.
#[derive(Resource)]
pub struct GameAudio {
    // Boundary and collision sounds
    pub hit_top_boundary: Handle<AudioSource>,
    pub hit_side_boundary: Handle<AudioSource>,
    pub hit_bottom_boundary: Handle<AudioSource>,
    pub hit_paddle: Handle<AudioSource>,
    pub hit_brick: Handle<AudioSource>,
    pub hit_unbreakable_brick: Handle<AudioSource>,
    pub hit_bonus_brick: Handle<AudioSource>,
    pub hit_safety_barrier: Handle<AudioSource>,

    // Level flow
    pub lose_life: Handle<AudioSource>,
    pub game_over_voice: Handle<AudioSource>,
    pub level_complete_sound: Handle<AudioSource>,
    pub level_complete_voice: Handle<AudioSource>,
    pub level_up: Handle<AudioSource>,
    pub adding_bonus_1: Handle<AudioSource>,
    pub adding_bonus_2: Handle<AudioSource>,
    pub adding_bonus_3: Handle<AudioSource>,
    pub shoot_bullet: Handle<AudioSource>,

    // Icon catch tones
    pub collect_icon_tone: Handle<AudioSource>,
    pub lengthen_icon_tone: Handle<AudioSource>,
    pub shorten_icon_tone: Handle<AudioSource>,
    pub bonus_score_icon_tone: Handle<AudioSource>,
    pub shooting_icon_tone: Handle<AudioSource>,
    pub bonus_life_icon_tone: Handle<AudioSource>,
    pub speed_up_icon_tone: Handle<AudioSource>,
    pub slow_down_icon_tone: Handle<AudioSource>,
    pub invincible_ball_icon_tone: Handle<AudioSource>,

    // Menus and transitions
    pub press_enter: Handle<AudioSource>,
    pub scroll_options: Handle<AudioSource>,
    pub whoosh: Handle<AudioSource>,
    pub whoosh_2: Handle<AudioSource>,
    pub bounce_1: Handle<AudioSource>,
    pub bounce_2: Handle<AudioSource>,
    pub high_score_voice: Handle<AudioSource>,
    pub invalid_name_tone: Handle<AudioSource>,
    pub no_next_item_tone: Handle<AudioSource>,

    // Music tracks
    pub game_intro_music: Handle<AudioSource>,
    pub main_menu_music: Handle<AudioSource>,
    pub how_to_play_music: Handle<AudioSource>,
    pub high_scores_music: Handle<AudioSource>,
    pub pause_menu_music: Handle<AudioSource>,

    // Indexed by level number - 1
    pub level_music: Vec<Handle<AudioSource>>,
    pub level_voices: Vec<Handle<AudioSource>>,
}

fn setup_audio(mut commands: Commands, asset_server: Res<AssetServer>) {
    let sound = |name: &str| asset_server.load(format!("audio/sounds/{name}.wav"));
    let music = |name: &str| asset_server.load(format!("audio/background_music/{name}.mp3"));

    let level_count = crate::level::CAMPAIGN.len();
    let level_music = (1..=level_count)
        .map(|n| music(&format!("level_{n}_music")))
        .collect();
    let level_voices = (1..=level_count)
        .map(|n| sound(&format!("level_{n}_voice")))
        .collect();

    commands.insert_resource(GameAudio {
        hit_top_boundary: sound("hit_top_boundary"),
        hit_side_boundary: sound("hit_side_boundary"),
        hit_bottom_boundary: sound("hit_bottom_boundary"),
        hit_paddle: sound("hit_paddle"),
        hit_brick: sound("hit_brick"),
        hit_unbreakable_brick: sound("hit_unbreakable_brick"),
        hit_bonus_brick: sound("hit_bonus_brick"),
        hit_safety_barrier: sound("hit_safety_barrier"),
        lose_life: sound("lose_life"),
        game_over_voice: sound("game_over_voice"),
        level_complete_sound: sound("level_complete_sound"),
        level_complete_voice: sound("level_complete_voice"),
        level_up: sound("level_up_sound"),
        adding_bonus_1: sound("adding_bonus_1"),
        adding_bonus_2: sound("adding_bonus_2"),
        adding_bonus_3: sound("adding_bonus_3"),
        shoot_bullet: sound("shoot_bullet_sound"),
        collect_icon_tone: sound("collect_icon_tone"),
        lengthen_icon_tone: sound("lengthen_icon_tone"),
        shorten_icon_tone: sound("shorten_icon_tone"),
        bonus_score_icon_tone: sound("bonus_score_icon_tone"),
        shooting_icon_tone: sound("shooting_icon_tone"),
        bonus_life_icon_tone: sound("bonus_life_icon_tone"),
        speed_up_icon_tone: sound("speed_up_icon_tone"),
        slow_down_icon_tone: sound("slow_down_icon_tone"),
        invincible_ball_icon_tone: sound("invincible_ball_icon_tone"),
        press_enter: sound("press_enter"),
        scroll_options: sound("scroll_options"),
        whoosh: sound("whoosh_1"),
        whoosh_2: sound("whoosh_2"),
        bounce_1: sound("bounce_1"),
        bounce_2: sound("bounce_2"),
        high_score_voice: sound("high_score_voice"),
        invalid_name_tone: sound("invalid_name_tone"),
        no_next_item_tone: sound("no_next_item_tone"),
        game_intro_music: music("game_intro_music"),
        main_menu_music: music("main_menu_music"),
        how_to_play_music: music("how_to_play_music"),
        high_scores_music: music("high_scores_music"),
        pause_menu_music: music("pause_menu_music"),
        level_music,
        level_voices,
    });
}

/// Marks the currently playing background-music entity.
#[derive(Component)]
pub struct Music;

/// Swaps the looping background music to a new track.
#[derive(Event)]
pub struct StartMusic {
    pub track: Handle<AudioSource>,
    pub volume: f32,
}

#[derive(Event)]
pub struct StopMusic;

fn on_start_music(
    trigger: On<StartMusic>,
    playing: Query<Entity, With<Music>>,
    mut commands: Commands,
) {
    for entity in playing.iter() {
        commands.entity(entity).despawn();
    }
    commands.spawn((
        AudioPlayer::new(trigger.track.clone()),
        PlaybackSettings::LOOP.with_volume(Volume::Linear(trigger.volume)),
        Music,
    ));
}

fn on_stop_music(
    _trigger: On<StopMusic>,
    playing: Query<Entity, With<Music>>,
    mut commands: Commands,
) {
    for entity in playing.iter() {
        commands.entity(entity).despawn();
    }
}

/// Fire-and-forget sound effect. The entity despawns once playback ends.
pub fn play_sfx(commands: &mut Commands, handle: &Handle<AudioSource>) {
    commands.spawn((
        AudioPlayer::new(handle.clone()),
        PlaybackSettings::DESPAWN.with_volume(Volume::Linear(SFX_VOLUME)),
    ));
}
