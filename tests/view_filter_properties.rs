//! Property coverage for the per-recipient game-state projection: across
//! arbitrary hands, a non-recipient's private cards never survive filtering.

use chrono::Utc;
use game_fabric_server::protocol::{GameState, PlayerGameState, RoomStatus};
use game_fabric_server::view_filter::filter;
use proptest::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

fn state_with_hands(owner_cards: Vec<u32>, other_cards: Vec<u32>) -> (GameState, Uuid, Uuid) {
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let mut players = HashMap::new();
    players.insert(
        owner,
        PlayerGameState {
            position: 1,
            card_count: owner_cards.len() as u32,
            private_cards: owner_cards,
            passed: false,
            finished: false,
            rank: None,
        },
    );
    players.insert(
        other,
        PlayerGameState {
            position: 2,
            card_count: other_cards.len() as u32,
            private_cards: other_cards,
            passed: false,
            finished: false,
            rank: None,
        },
    );

    let state = GameState {
        room_id: "room_test".to_string(),
        game_type: "bull".to_string(),
        status: RoomStatus::InGame,
        round: 1,
        current_player_id: Some(owner),
        last_cards: vec![],
        last_player_id: None,
        pass_count: 0,
        start_time: Utc::now(),
        players,
        deck: vec![],
    };
    (state, owner, other)
}

proptest! {
    #[test]
    fn recipient_keeps_own_hand_and_never_sees_the_other_players_cards(
        owner_cards in prop::collection::vec(0u32..54, 0..20),
        other_cards in prop::collection::vec(0u32..54, 0..20),
    ) {
        let (state, owner, other) = state_with_hands(owner_cards.clone(), other_cards);

        let view = filter(&state, owner);
        prop_assert_eq!(view.players[&owner].private_cards.clone(), owner_cards);
        prop_assert!(view.players[&other].private_cards.is_empty());
        prop_assert_eq!(view.players[&other].card_count as usize, state.players[&other].private_cards.len());
    }

    #[test]
    fn card_counts_survive_filtering_regardless_of_recipient(
        owner_cards in prop::collection::vec(0u32..54, 0..20),
        other_cards in prop::collection::vec(0u32..54, 0..20),
    ) {
        let (state, owner, other) = state_with_hands(owner_cards, other_cards);

        let owner_view = filter(&state, owner);
        let other_view = filter(&state, other);
        prop_assert_eq!(owner_view.players[&owner].card_count, other_view.players[&owner].card_count);
        prop_assert_eq!(owner_view.players[&other].card_count, other_view.players[&other].card_count);
    }
}
