//! Pluggable game-rules strategy, invoked by the Coordinator on `start`.
//!
//! The specification treats rules engines as external collaborators: "the
//! card-rules engines appear in the spec only as an abstract 'rules
//! strategy' the coordinator invokes on game start; their internal logic is
//! not specified here." `BullRules` below exists only to make the testable
//! scenarios (S1 in particular) exercisable end to end, not as a complete
//! game implementation.

use crate::protocol::game_state::{GameState, PlayerGameState};
use crate::protocol::room::Room;
use crate::protocol::types::RoomStatus;
use std::collections::HashMap;

pub trait RulesStrategy: Send + Sync {
    /// Derives the initial canonical `GameState` for a room transitioning
    /// `waiting -> in_game`. Returning `Err` leaves the room in `waiting`
    /// per §7's partial-failure policy for `start`.
    fn deal(&self, room: &Room) -> anyhow::Result<GameState>;
}

/// Reference strategy for the `"bull"` game type: deals five cards per
/// player from a standard 52-card deck (no jokers), first player to join
/// goes first.
pub struct BullRules;

const CARDS_PER_PLAYER: usize = 5;
const DECK_SIZE: u32 = 52;

impl RulesStrategy for BullRules {
    fn deal(&self, room: &Room) -> anyhow::Result<GameState> {
        if room.players.len() < 2 {
            anyhow::bail!("bull requires at least two players to deal");
        }
        let mut deck: Vec<u32> = (0..DECK_SIZE).collect();
        shuffle(&mut deck);

        let mut players = HashMap::new();
        let mut cursor = 0usize;
        for player in &room.players {
            let hand: Vec<u32> = deck[cursor..cursor + CARDS_PER_PLAYER].to_vec();
            cursor += CARDS_PER_PLAYER;
            players.insert(
                player.user_id,
                PlayerGameState {
                    position: player.position,
                    private_cards: hand,
                    card_count: CARDS_PER_PLAYER as u32,
                    passed: false,
                    finished: false,
                    rank: None,
                },
            );
        }

        let first_player = room
            .players
            .iter()
            .min_by_key(|p| p.position)
            .map(|p| p.user_id);

        Ok(GameState {
            room_id: room.room_id.clone(),
            game_type: room.game_type.clone(),
            status: RoomStatus::InGame,
            round: 1,
            current_player_id: first_player,
            last_cards: Vec::new(),
            last_player_id: None,
            pass_count: 0,
            start_time: chrono::Utc::now(),
            players,
            deck: deck[cursor..].to_vec(),
        })
    }
}

fn shuffle(deck: &mut [u32]) {
    for i in (1..deck.len()).rev() {
        let j = fastrand::usize(0..=i);
        deck.swap(i, j);
    }
}

/// Looks up the rules strategy for a room's `game_type`. Unknown game types
/// are an operator configuration error surfaced as `precondition-failed`,
/// not something this fabric infers.
pub struct RulesRegistry {
    strategies: HashMap<String, Box<dyn RulesStrategy>>,
}

impl Default for RulesRegistry {
    fn default() -> Self {
        let mut strategies: HashMap<String, Box<dyn RulesStrategy>> = HashMap::new();
        strategies.insert("bull".to_string(), Box::new(BullRules));
        Self { strategies }
    }
}

impl RulesRegistry {
    pub fn get(&self, game_type: &str) -> Option<&dyn RulesStrategy> {
        self.strategies.get(game_type).map(|b| b.as_ref())
    }

    pub fn register(&mut self, game_type: impl Into<String>, strategy: Box<dyn RulesStrategy>) {
        self.strategies.insert(game_type.into(), strategy);
    }
}
