//! Integration tests driving whole games through the engine the same way
//! the request handlers do, verifying the rules and the invariants that must
//! hold for every reachable game state.

use pretty_assertions::assert_eq;
use tuicub::error::Error;
use tuicub::game::{Game, GameState, Player, Turn};
use tuicub::gameroom::Gameroom;
use tuicub::pile::Pile;
use tuicub::rng::GameRng;
use tuicub::rules;
use tuicub::tile::{Board, Tile, Tileset, FULL_DECK};
use tuicub::user::User;
use uuid::Uuid;

fn tiles(ids: &[u8]) -> Tileset {
    ids.iter().map(|&id| Tile::new(id).unwrap()).collect()
}

/// Builds a running game with the given racks; the first player holds the
/// turn and the pile holds everything not dealt.
fn game_with_racks(racks: &[&[u8]]) -> Game {
    let players: Vec<Player> = racks
        .iter()
        .enumerate()
        .map(|(index, rack)| {
            Player::new(Uuid::new_v4(), format!("player-{index}"), tiles(rack))
        })
        .collect();

    let dealt: Vec<Tile> = players
        .iter()
        .flat_map(|player| player.rack.tiles().iter().copied())
        .collect();
    let remaining: Vec<Tile> = FULL_DECK
        .iter()
        .copied()
        .filter(|tile| !dealt.contains(tile))
        .collect();

    let game_id = Uuid::new_v4();
    let turn = Turn::new(game_id, &players[0], Board::default());
    Game {
        id: game_id,
        gameroom_id: Uuid::new_v4(),
        turn_order: players.iter().map(|player| player.user_id).collect(),
        game_state: GameState {
            id: Uuid::new_v4(),
            game_id,
            players,
            board: Board::default(),
            pile: Pile::new(remaining),
        },
        turn,
        made_meld: Vec::new(),
        winner: None,
    }
}

/// The move operation as the games service performs it.
fn do_move(game: Game, user_id: Uuid, candidate: &[Vec<u8>]) -> Result<Game, Error> {
    game.ensure_not_ended()?;
    let player = game.player_for_user_id(user_id)?.clone();
    game.ensure_has_turn(&player)?;

    let candidate = Board::from_ids(candidate)?;
    let (rack, board) =
        rules::perform_move(&player.rack, &game.game_state.board, candidate)?;
    game.with_new_move(rack, board, &player)
}

/// The end-turn operation as the games service performs it.
fn do_end_turn(game: Game, user_id: Uuid) -> Result<Game, Error> {
    game.ensure_not_ended()?;
    let player = game.player_for_user_id(user_id)?.clone();
    game.ensure_has_turn(&player)?;
    game.turn.ensure_has_moves()?;
    rules::ensure_board_valid(&game)?;

    let game = if !game.has_made_meld(user_id) {
        rules::ensure_meld_valid(
            &game.turn.starting_rack,
            &game.game_state.board,
            &game.turn.starting_board,
        )?;
        game.with_new_meld(user_id)
    } else {
        game
    };
    game.with_next_turn()
}

/// The draw operation as the games service performs it.
fn do_draw(game: Game, user_id: Uuid, rng: &mut GameRng) -> Result<(Tile, Game), Error> {
    game.ensure_not_ended()?;
    let player = game.player_for_user_id(user_id)?.clone();
    game.ensure_has_turn(&player)?;
    game.turn.ensure_has_no_moves()?;

    let mut game = game;
    let tile = game.game_state.pile.draw(rng)?;
    let game = game.with_drawn_tile(tile, &player)?;
    Ok((tile, game.with_next_turn()?))
}

/// Asserts that every tile of the deck appears exactly once across the
/// board, the pile and all racks.
fn assert_deck_conserved(game: &Game) {
    let mut all: Vec<Tile> = game.game_state.pile.tiles().to_vec();
    all.extend(game.game_state.board.all_tiles());
    for player in &game.game_state.players {
        all.extend_from_slice(player.rack.tiles());
    }
    all.sort_unstable();

    assert_eq!(*FULL_DECK, all, "the deck must be conserved");
}

#[test]
fn opening_meld_below_30_is_rejected_without_state_change() {
    // Red 1, 2, 3 is a legal run but only worth 6.
    let game = game_with_racks(&[&[0, 1, 2, 30, 31, 32], &[60, 61, 62]]);
    let actor = game.turn_order[0];

    let game = do_move(game, actor, &[vec![0, 1, 2]]).unwrap();
    let before = game.clone();

    let result = do_end_turn(game, actor);

    assert!(matches!(result, Err(Error::InvalidMeld(_))));
    // The engine is pure: a failed end-turn leaves the caller's game as it
    // was after the move.
    assert_eq!(before.turn.revision, 1);
    assert!(before.made_meld.is_empty());
}

#[test]
fn opening_meld_with_a_full_run_succeeds() {
    // Red 1..13 is worth 91.
    let run: Vec<u8> = (0..13).collect();
    let game = game_with_racks(&[&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 30], &[60, 61, 62]]);
    let actor = game.turn_order[0];
    let second = game.turn_order[1];

    let game = do_move(game, actor, &[run.clone()]).unwrap();
    let game = do_end_turn(game, actor).unwrap();

    assert!(game.has_made_meld(actor));
    assert_eq!(None, game.winner);
    assert_eq!(second, game.current_player().unwrap().user_id);
    assert_eq!(game.game_state.board, game.turn.starting_board);
    assert_deck_conserved(&game);
}

#[test]
fn melded_players_are_not_subject_to_the_meld_rule_again() {
    let run: Vec<u8> = (0..13).collect();
    // First player: the full red run, a group of 1s worth only 3, and one
    // spare tile so the second play does not empty the rack.
    let game = game_with_racks(&[
        &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 52, 13, 26, 30],
        &[60, 61, 62],
    ]);
    let mut rng = GameRng::seeded(17);
    let first = game.turn_order[0];
    let second = game.turn_order[1];

    // First player melds with the run.
    let game = do_move(game, first, &[run.clone()]).unwrap();
    let game = do_end_turn(game, first).unwrap();

    // Second player draws, handing the turn back.
    let (_, game) = do_draw(game, second, &mut rng).unwrap();
    assert_eq!(first, game.current_player().unwrap().user_id);

    // The group of 1s is worth 3; it passes only because the meld rule no
    // longer applies to this player.
    let game = do_move(game, first, &[run, vec![52, 13, 26]]).unwrap();
    let game = do_end_turn(game, first).unwrap();

    assert_eq!(second, game.current_player().unwrap().user_id);
    assert_deck_conserved(&game);
}

#[test]
fn undoing_all_moves_restores_the_starting_turn_state() {
    let game = game_with_racks(&[&[0, 1, 2, 3, 4, 5], &[60, 61, 62]]);
    let actor = game.turn_order[0];
    let starting_rack = game.turn.starting_rack.clone();

    let game = do_move(game, actor, &[vec![0, 1, 2]]).unwrap();
    let game = do_move(game, actor, &[vec![0, 1, 2], vec![3, 4, 5]]).unwrap();

    let player = game.current_player().unwrap().clone();
    let game = game.with_undo(&player).unwrap();
    let game = game.with_undo(&player).unwrap();

    assert_eq!(Board::default(), game.game_state.board);
    assert_eq!(starting_rack, game.current_player().unwrap().rack);
    assert_eq!(0, game.turn.revision);
    assert_deck_conserved(&game);
}

#[test]
fn a_move_after_undo_makes_the_old_branch_unreachable() {
    // Scenario: move to [[a, b, c]], undo, move to [[a, b]]; redo must fail.
    let game = game_with_racks(&[&[0, 1, 2], &[60, 61, 62]]);
    let actor = game.turn_order[0];

    let game = do_move(game, actor, &[vec![0, 1, 2]]).unwrap();
    let player = game.current_player().unwrap().clone();
    let game = game.with_undo(&player).unwrap();
    let game = do_move(game, actor, &[vec![0, 1]]).unwrap();

    let player = game.current_player().unwrap().clone();
    assert!(matches!(
        game.with_redo(&player),
        Err(Error::NoMoveToRedo { .. })
    ));
}

#[test]
fn draw_is_refused_after_a_move() {
    let game = game_with_racks(&[&[0, 1, 2, 30], &[60, 61, 62]]);
    let mut rng = GameRng::seeded(3);
    let actor = game.turn_order[0];

    let game = do_move(game, actor, &[vec![0, 1, 2]]).unwrap();

    assert!(matches!(
        do_draw(game, actor, &mut rng),
        Err(Error::MovesPerformed { .. })
    ));
}

#[test]
fn ending_a_turn_without_moves_is_refused() {
    let game = game_with_racks(&[&[0, 1, 2], &[60, 61, 62]]);
    let actor = game.turn_order[0];

    assert!(matches!(
        do_end_turn(game, actor),
        Err(Error::NoMovesPerformed { .. })
    ));
}

#[test]
fn acting_out_of_turn_is_refused() {
    let game = game_with_racks(&[&[0, 1, 2], &[60, 61, 62]]);
    let waiting = game.turn_order[1];

    assert!(matches!(
        do_move(game, waiting, &[vec![60, 61, 62]]),
        Err(Error::NotUserTurn { .. })
    ));
}

#[test]
fn strangers_cannot_act_at_all() {
    let game = game_with_racks(&[&[0, 1, 2], &[60, 61, 62]]);

    assert!(matches!(
        do_move(game, Uuid::new_v4(), &[vec![0, 1, 2]]),
        Err(Error::UserNotInGame { .. })
    ));
}

#[test]
fn emptying_the_rack_wins_the_game() {
    let run: Vec<u8> = (0..13).collect();
    let game = game_with_racks(&[&run, &[60, 61, 62]]);
    let actor = game.turn_order[0];

    let game = do_move(game, actor, &[run]).unwrap();
    let game = do_end_turn(game, actor).unwrap();

    let winner = game.winner.as_ref().expect("the game should be won");
    assert_eq!(actor, winner.user_id);

    // A won game refuses further mutation.
    assert!(matches!(
        do_end_turn(game, actor),
        Err(Error::GameEnded)
    ));
}

#[test]
fn draws_rotate_turns_and_conserve_the_deck() {
    let gameroom = Gameroom::create(&User::new("Alice"))
        .unwrap()
        .with_joining(&User::new("Bob"))
        .unwrap()
        .with_joining(&User::new("Carol"))
        .unwrap();
    let mut rng = GameRng::seeded(99);
    let mut game = rules::create_game(&gameroom, &mut rng).unwrap();

    assert_deck_conserved(&game);
    let order = game.turn_order.clone();

    for round in 0..30 {
        let expected_user = order[round % order.len()];
        let current = game.current_player().unwrap();
        assert_eq!(expected_user, current.user_id);
        let rack_before = current.rack.len();
        let pile_before = game.game_state.pile.len();

        let (tile, next) = do_draw(game, expected_user, &mut rng).unwrap();

        let drawer = next.player_for_user_id(expected_user).unwrap();
        assert!(drawer.rack.contains(tile));
        assert_eq!(rack_before + 1, drawer.rack.len());
        assert_eq!(pile_before - 1, next.game_state.pile.len());
        assert_deck_conserved(&next);
        game = next;
    }
}

#[test]
fn last_opponent_disconnect_wins_the_game() {
    let mut rng = GameRng::seeded(5);
    let game = game_with_racks(&[&[0, 1, 2], &[60, 61, 62]]);
    let leaver = game.current_player().unwrap().clone();
    let remaining_user = game.turn_order[1];

    let (game, turn) = game.with_disconnected_player(&leaver, &mut rng).unwrap();

    assert_eq!(None, turn);
    assert_eq!(remaining_user, game.winner.as_ref().unwrap().user_id);
}

#[test]
fn turn_holder_disconnect_reverts_the_board_and_conserves_the_deck() {
    let mut rng = GameRng::seeded(6);
    let game = game_with_racks(&[&[0, 1, 2, 30], &[60, 61, 62], &[90, 91, 92]]);
    let actor = game.turn_order[0];
    let second = game.turn_order[1];
    let pile_before = game.game_state.pile.len();

    // The turn holder has played three tiles when the disconnect arrives.
    let game = do_move(game, actor, &[vec![0, 1, 2]]).unwrap();
    let leaver = game.current_player().unwrap().clone();

    let (game, turn) = game.with_disconnected_player(&leaver, &mut rng).unwrap();

    assert!(turn.is_some());
    assert_eq!(Board::default(), game.game_state.board);
    assert_eq!(second, game.current_player().unwrap().user_id);
    // The leaver held four tiles at the start of the turn; all four return
    // to the pile, including the three that sat on the board.
    assert_eq!(pile_before + 4, game.game_state.pile.len());
    assert_deck_conserved(&game);
}
