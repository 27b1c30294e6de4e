use tracing::info;

pub const TUTORIAL_PAGES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Title,
    Tutorial { page: u8 },
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAdvance {
    ShowPage(u8),
    StartGame,
    AlreadyPlaying,
}

/// Title card, then the tutorial pages, then play.
#[derive(Debug, Clone)]
pub struct StartFlow {
    phase: StartPhase,
}

impl Default for StartFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl StartFlow {
    pub fn new() -> Self {
        Self {
            phase: StartPhase::Title,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == StartPhase::Playing
    }

    pub fn advance(&mut self) -> StartAdvance {
        let (next, outcome) = match self.phase {
            StartPhase::Title => (StartPhase::Tutorial { page: 0 }, StartAdvance::ShowPage(0)),
            StartPhase::Tutorial { page } if page + 1 < TUTORIAL_PAGES => (
                StartPhase::Tutorial { page: page + 1 },
                StartAdvance::ShowPage(page + 1),
            ),
            StartPhase::Tutorial { .. } => (StartPhase::Playing, StartAdvance::StartGame),
            StartPhase::Playing => return StartAdvance::AlreadyPlaying,
        };
        self.phase = next;
        if outcome == StartAdvance::StartGame {
            info!("game_started");
        }
        outcome
    }
}

pub fn tutorial_page_path(page: u8) -> String {
    format!("textures/learn_{page}.png")
}

pub fn tutorial_page_title(page: u8) -> String {
    format!("How to birdwatch ({}/{TUTORIAL_PAGES})", page + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_advance_starts_the_game() {
        let mut flow = StartFlow::new();
        assert_eq!(flow.advance(), StartAdvance::ShowPage(0));
        assert_eq!(flow.advance(), StartAdvance::ShowPage(1));
        assert_eq!(flow.advance(), StartAdvance::ShowPage(2));
        assert!(!flow.is_playing());
        assert_eq!(flow.advance(), StartAdvance::StartGame);
        assert!(flow.is_playing());
        assert_eq!(flow.advance(), StartAdvance::AlreadyPlaying);
    }

    #[test]
    fn page_assets_are_numbered_from_zero() {
        assert_eq!(tutorial_page_path(1), "textures/learn_1.png");
        assert_eq!(tutorial_page_title(2), "How to birdwatch (3/3)");
    }
}
