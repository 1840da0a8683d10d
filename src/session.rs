use bevy::prelude::*;

pub const STARTING_LIVES: u32 = 3;

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Session>();
        app.add_systems(Update, advance_display_score);
    }
}

/// Score, lives and progress for the current game, surviving across levels.
#[derive(Resource)]
pub struct Session {
    pub score: u32,
    /// What the HUD shows. Trails `score` and counts up toward it, which
    /// creates the tick-up effect when a large award lands.
    pub display_score: u32,
    pub lives: u32,
    pub level_number: usize,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            score: 0,
            display_score: 0,
            lives: STARTING_LIVES,
            level_number: 0,
        }
    }
}

impl Session {
    pub fn reset(&mut self) {
        *self = Session::default();
    }
}

// Frame-locked on purpose: the count-up pace doubles as a timing gate for
// the level-complete and game-over sequences.
fn advance_display_score(mut session: ResMut<Session>) {
    if session.display_score < session.score {
        session.display_score = (session.display_score + 5).min(session.score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_score_never_overshoots() {
        let mut session = Session::default();
        session.score = 12;
        session.display_score = 10;
        session.display_score = (session.display_score + 5).min(session.score);
        assert_eq!(session.display_score, 12);
    }

    #[test]
    fn reset_restores_starting_state() {
        let mut session = Session {
            score: 9000,
            display_score: 9000,
            lives: 1,
            level_number: 7,
        };
        session.reset();
        assert_eq!(session.score, 0);
        assert_eq!(session.lives, STARTING_LIVES);
        assert_eq!(session.level_number, 0);
    }
}
