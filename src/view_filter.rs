//! C10 — Game-State View Filter.
//!
//! Derives a per-recipient projection of a canonical `GameState`: every
//! player's aggregate facts are revealed to everyone, but `private_cards` is
//! only kept for the recipient themselves.

use crate::protocol::game_state::{GameState, PlayerGameState};
use crate::protocol::types::UserId;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilteredPlayerView {
    pub position: u8,
    #[serde(rename = "cards")]
    pub private_cards: Vec<u32>,
    pub card_count: u32,
    pub passed: bool,
    pub finished: bool,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilteredGameState {
    pub room_id: String,
    pub game_type: String,
    pub status: crate::protocol::types::RoomStatus,
    pub round: u32,
    pub current_player_id: Option<UserId>,
    pub last_cards: Vec<u32>,
    pub last_player_id: Option<UserId>,
    pub pass_count: u32,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub players: HashMap<UserId, FilteredPlayerView>,
}

/// Produces the projection of `state` visible to `recipient`. The raw deck
/// is never part of `GameState`'s serialized form (see its `#[serde(skip)]`
/// field), so there is nothing further to elide for it here.
pub fn filter(state: &GameState, recipient: UserId) -> FilteredGameState {
    let players = state
        .players
        .iter()
        .map(|(&user_id, p)| {
            let view = filter_player(p, user_id == recipient);
            (user_id, view)
        })
        .collect();

    FilteredGameState {
        room_id: state.room_id.clone(),
        game_type: state.game_type.clone(),
        status: state.status,
        round: state.round,
        current_player_id: state.current_player_id,
        last_cards: state.last_cards.clone(),
        last_player_id: state.last_player_id,
        pass_count: state.pass_count,
        start_time: state.start_time,
        players,
    }
}

fn filter_player(player: &PlayerGameState, reveal_cards: bool) -> FilteredPlayerView {
    FilteredPlayerView {
        position: player.position,
        private_cards: if reveal_cards {
            player.private_cards.clone()
        } else {
            Vec::new()
        },
        card_count: player.card_count,
        passed: player.passed,
        finished: player.finished,
        rank: player.rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::RoomStatus;
    use uuid::Uuid;

    fn sample_state(u1: UserId, u2: UserId) -> GameState {
        let mut players = HashMap::new();
        players.insert(
            u1,
            PlayerGameState {
                position: 1,
                private_cards: vec![1, 2, 3],
                card_count: 3,
                passed: false,
                finished: false,
                rank: None,
            },
        );
        players.insert(
            u2,
            PlayerGameState {
                position: 2,
                private_cards: vec![4, 5, 6],
                card_count: 3,
                passed: false,
                finished: false,
                rank: None,
            },
        );
        GameState {
            room_id: "room_abc".into(),
            game_type: "bull".into(),
            status: RoomStatus::InGame,
            round: 1,
            current_player_id: Some(u1),
            last_cards: vec![],
            last_player_id: None,
            pass_count: 0,
            start_time: chrono::Utc::now(),
            players,
            deck: vec![9, 9, 9],
        }
    }

    #[test]
    fn recipient_sees_own_cards_others_hidden() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let state = sample_state(u1, u2);

        let view1 = filter(&state, u1);
        assert_eq!(view1.players[&u1].private_cards, vec![1, 2, 3]);
        assert!(view1.players[&u2].private_cards.is_empty());

        let view2 = filter(&state, u2);
        assert_eq!(view2.players[&u2].private_cards, vec![4, 5, 6]);
        assert!(view2.players[&u1].private_cards.is_empty());
    }

    #[test]
    fn identical_except_for_cards() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let state = sample_state(u1, u2);

        let view1 = filter(&state, u1);
        let view2 = filter(&state, u2);

        assert_eq!(view1.room_id, view2.room_id);
        assert_eq!(view1.round, view2.round);
        assert_eq!(view1.current_player_id, view2.current_player_id);
        assert_eq!(view1.players[&u1].card_count, view2.players[&u1].card_count);
        assert_eq!(view1.players[&u1].position, view2.players[&u1].position);
    }

    #[test]
    fn filtering_is_idempotent() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let state = sample_state(u1, u2);
        let once = filter(&state, u1);

        // Re-filtering the already-filtered state for the same recipient
        // should leave the visible cards unchanged: build a GameState with
        // the same shape from the filtered view and confirm the cards for
        // `u1` survive a second pass.
        let mut reconstructed_players = HashMap::new();
        for (uid, view) in &once.players {
            reconstructed_players.insert(
                *uid,
                PlayerGameState {
                    position: view.position,
                    private_cards: view.private_cards.clone(),
                    card_count: view.card_count,
                    passed: view.passed,
                    finished: view.finished,
                    rank: view.rank,
                },
            );
        }
        let reconstructed = GameState {
            players: reconstructed_players,
            ..state.clone()
        };
        let twice = filter(&reconstructed, u1);
        assert_eq!(once.players[&u1].private_cards, twice.players[&u1].private_cards);
    }
}
