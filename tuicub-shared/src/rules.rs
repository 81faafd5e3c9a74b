//! Game creation and the validation rules moves must pass.

use crate::dictionary::DICTIONARY;
use crate::error::{Error, MoveInfo};
use crate::game::{Game, GameState, Player, Turn};
use crate::gameroom::Gameroom;
use crate::pile::Pile;
use crate::rng::GameRng;
use crate::tile::{Board, Tile, Tileset, FULL_DECK};
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// The minimum combined value of the tilesets in an opening meld.
pub const MIN_MELD_VALUE: u32 = 30;

/// Creates a new game for a gameroom.
///
/// The pile starts as a shuffle of the full deck; every gameroom user gets a
/// player with a 14-tile rack; the shuffled player order becomes the fixed
/// turn order, and the first turn belongs to the first player in it.
pub fn create_game(gameroom: &Gameroom, rng: &mut GameRng) -> Result<Game, Error> {
    if gameroom.users.len() < 2 {
        return Err(Error::NotEnoughPlayers);
    }

    let mut pile = Pile::new(rng.shuffle(&FULL_DECK));
    let players = create_players(&mut pile, gameroom, rng)?;

    let game_id = Uuid::new_v4();
    let first = &players[0];
    let turn = Turn::new(game_id, first, Board::default());
    Ok(Game {
        id: game_id,
        gameroom_id: gameroom.id,
        turn_order: players.iter().map(|player| player.user_id).collect(),
        game_state: GameState {
            id: Uuid::new_v4(),
            game_id,
            players,
            board: Board::default(),
            pile,
        },
        turn,
        made_meld: Vec::new(),
        winner: None,
    })
}

fn create_players(
    pile: &mut Pile,
    gameroom: &Gameroom,
    rng: &mut GameRng,
) -> Result<Vec<Player>, Error> {
    let mut players = Vec::with_capacity(gameroom.users.len());
    for user in &gameroom.users {
        players.push(Player::new(user.id, user.name.clone(), pile.draw_rack(rng)?));
    }
    Ok(rng.shuffle(&players))
}

/// Validates a move and computes its outcome.
///
/// The candidate board must contain no duplicate tiles, keep every tile of
/// the current board, and source every new tile from the player's rack.
/// Returns the player's rack after the move and the new board.
pub fn perform_move(
    rack: &Tileset,
    current: &Board,
    candidate: Board,
) -> Result<(Tileset, Board), Error> {
    ensure_no_duplicate_tiles(rack, current, &candidate)?;
    ensure_has_all_previous_tiles(rack, current, &candidate)?;
    ensure_all_new_tiles_from_rack(rack, current, &candidate)?;

    let new_tiles: HashSet<Tile> = new_tiles(current, &candidate);
    let remaining = Tileset::new(
        rack.tiles()
            .iter()
            .copied()
            .filter(|tile| !new_tiles.contains(tile)),
    );
    Ok((remaining, candidate))
}

/// Validates the whole board at the end of a turn.
///
/// Relative to the turn's starting board: no duplicates, nothing missing,
/// every new tile from the starting rack, at least one new tile, and every
/// tileset on the board legal per the dictionary.
pub fn ensure_board_valid(game: &Game) -> Result<(), Error> {
    let rack = &game.turn.starting_rack;
    let previous = &game.turn.starting_board;
    let current = &game.game_state.board;

    ensure_no_duplicate_tiles(rack, previous, current)?;
    ensure_has_all_previous_tiles(rack, previous, current)?;
    ensure_all_new_tiles_from_rack(rack, previous, current)?;

    if new_tiles(previous, current).is_empty() {
        return Err(Error::NoNewTiles(move_info(rack, previous, current)));
    }

    if !current
        .tilesets()
        .iter()
        .all(|tileset| DICTIONARY.is_valid(tileset))
    {
        return Err(Error::InvalidTilesets(move_info(rack, previous, current)));
    }

    Ok(())
}

/// Checks the opening-meld rule.
///
/// The tilesets that are on the current board but not on the previous one
/// (compared as sets of ids) must be built entirely from the player's
/// starting rack, and their combined value must reach [`MIN_MELD_VALUE`].
pub fn ensure_meld_valid(
    rack: &Tileset,
    current: &Board,
    previous: &Board,
) -> Result<(), Error> {
    let previous_sets: HashSet<BTreeSet<Tile>> = id_sets(previous);
    let new_sets: Vec<BTreeSet<Tile>> = id_sets(current)
        .into_iter()
        .filter(|tileset| !previous_sets.contains(tileset))
        .collect();

    let rack_tiles: HashSet<Tile> = rack.tiles().iter().copied().collect();
    let from_rack = new_sets
        .iter()
        .flatten()
        .all(|tile| rack_tiles.contains(tile));
    if !from_rack {
        return Err(Error::InvalidMeld(move_info(rack, previous, current)));
    }

    let value: u32 = new_sets
        .iter()
        .map(|tileset| DICTIONARY.value_of(&tileset.iter().copied().collect()))
        .sum();
    if value < MIN_MELD_VALUE {
        return Err(Error::InvalidMeld(move_info(rack, previous, current)));
    }

    Ok(())
}

fn new_tiles(previous: &Board, current: &Board) -> HashSet<Tile> {
    let previous: HashSet<Tile> = previous.tile_set();
    current
        .tile_set()
        .into_iter()
        .filter(|tile| !previous.contains(tile))
        .collect()
}

fn id_sets(board: &Board) -> HashSet<BTreeSet<Tile>> {
    board
        .tilesets()
        .iter()
        .map(|tileset| tileset.tiles().iter().copied().collect())
        .collect()
}

fn ensure_no_duplicate_tiles(
    rack: &Tileset,
    previous: &Board,
    current: &Board,
) -> Result<(), Error> {
    if !current.all_tiles().iter().all_unique() {
        return Err(Error::DuplicateTiles(move_info(rack, previous, current)));
    }
    Ok(())
}

fn ensure_has_all_previous_tiles(
    rack: &Tileset,
    previous: &Board,
    current: &Board,
) -> Result<(), Error> {
    let current_tiles = current.tile_set();
    if !previous
        .all_tiles()
        .iter()
        .all(|tile| current_tiles.contains(tile))
    {
        return Err(Error::MissingBoardTiles(move_info(rack, previous, current)));
    }
    Ok(())
}

fn ensure_all_new_tiles_from_rack(
    rack: &Tileset,
    previous: &Board,
    current: &Board,
) -> Result<(), Error> {
    let rack_tiles: HashSet<Tile> = rack.tiles().iter().copied().collect();
    if !new_tiles(previous, current)
        .iter()
        .all(|tile| rack_tiles.contains(tile))
    {
        return Err(Error::NewTilesNotFromRack(move_info(
            rack, previous, current,
        )));
    }
    Ok(())
}

fn move_info(rack: &Tileset, current: &Board, candidate: &Board) -> MoveInfo {
    MoveInfo {
        rack: rack.clone(),
        current_board: current.clone(),
        candidate_board: candidate.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameroom::Gameroom;
    use crate::user::User;
    use pretty_assertions::assert_eq;

    fn tiles(ids: &[u8]) -> Tileset {
        ids.iter().map(|&id| Tile::new(id).unwrap()).collect()
    }

    fn board(tilesets: &[&[u8]]) -> Board {
        Board::new(tilesets.iter().map(|ids| tiles(ids)).collect())
    }

    fn full_gameroom(user_count: usize) -> Gameroom {
        let names = ["Alice", "Bob", "Carol", "Dave"];
        let mut gameroom = Gameroom::create(&User::new(names[0])).unwrap();
        for name in &names[1..user_count] {
            gameroom = gameroom.with_joining(&User::new(*name)).unwrap();
        }
        gameroom
    }

    #[test]
    fn create_game_rejects_a_lone_user() {
        let mut rng = GameRng::seeded(0);
        let gameroom = full_gameroom(1);

        assert_eq!(
            Err(Error::NotEnoughPlayers),
            create_game(&gameroom, &mut rng).map(|_| ())
        );
    }

    #[test]
    fn create_game_deals_every_player_a_full_rack() {
        let mut rng = GameRng::seeded(0);
        let gameroom = full_gameroom(3);

        let game = create_game(&gameroom, &mut rng).unwrap();

        assert_eq!(3, game.game_state.players.len());
        for player in &game.game_state.players {
            assert_eq!(14, player.rack.len());
        }
        assert_eq!(106 - 3 * 14, game.game_state.pile.len());
        assert!(game.game_state.board.tilesets().is_empty());
        assert!(game.made_meld.is_empty());
        assert_eq!(None, game.winner);
    }

    #[test]
    fn create_game_turn_belongs_to_the_first_in_turn_order() {
        let mut rng = GameRng::seeded(0);
        let gameroom = full_gameroom(2);

        let game = create_game(&gameroom, &mut rng).unwrap();

        let first = game.player_for_user_id(game.turn_order[0]).unwrap();
        assert_eq!(first.id, game.turn.player_id);
        assert_eq!(first.rack, game.turn.starting_rack);
    }

    #[test]
    fn seeded_games_are_deterministic() {
        let gameroom = full_gameroom(2);

        let lhs = create_game(&gameroom, &mut GameRng::seeded(9)).unwrap();
        let rhs = create_game(&gameroom, &mut GameRng::seeded(9)).unwrap();

        assert_eq!(lhs.turn_order, rhs.turn_order);
        assert_eq!(lhs.game_state.pile.tiles(), rhs.game_state.pile.tiles());
    }

    #[test]
    fn perform_move_takes_new_tiles_from_the_rack() {
        let rack = tiles(&[0, 1, 2, 30]);
        let current = board(&[&[10, 11, 12]]);

        let (remaining, new_board) =
            perform_move(&rack, &current, board(&[&[10, 11, 12], &[0, 1, 2]])).unwrap();

        assert_eq!(tiles(&[30]), remaining);
        assert_eq!(2, new_board.tilesets().len());
    }

    #[test]
    fn perform_move_rejects_duplicates() {
        let rack = tiles(&[0, 1, 2]);
        let current = Board::default();

        assert!(matches!(
            perform_move(&rack, &current, board(&[&[0, 0, 1]])),
            Err(Error::DuplicateTiles(_))
        ));
    }

    #[test]
    fn perform_move_rejects_boards_missing_current_tiles() {
        let rack = tiles(&[0, 1, 2]);
        let current = board(&[&[10, 11, 12]]);

        assert!(matches!(
            perform_move(&rack, &current, board(&[&[0, 1, 2]])),
            Err(Error::MissingBoardTiles(_))
        ));
    }

    #[test]
    fn perform_move_rejects_tiles_from_nowhere() {
        let rack = tiles(&[0, 1, 2]);
        let current = Board::default();

        assert!(matches!(
            perform_move(&rack, &current, board(&[&[3, 4, 5]])),
            Err(Error::NewTilesNotFromRack(_))
        ));
    }

    #[test]
    fn meld_below_30_is_rejected() {
        // Red 1, 2, 3 sums to 6.
        let rack = tiles(&[0, 1, 2, 26, 27, 28]);
        let current = board(&[&[0, 1, 2]]);

        assert!(matches!(
            ensure_meld_valid(&rack, &current, &Board::default()),
            Err(Error::InvalidMeld(_))
        ));
    }

    #[test]
    fn meld_of_a_full_run_is_accepted() {
        // Red 1..13 sums to 91.
        let run: Vec<u8> = (0..13).collect();
        let rack = tiles(&run);
        let current = board(&[&run]);

        assert!(ensure_meld_valid(&rack, &current, &Board::default()).is_ok());
    }

    #[test]
    fn meld_must_come_from_the_players_own_rack() {
        let run: Vec<u8> = (0..13).collect();
        let rack = tiles(&[40, 41, 42]);
        let current = board(&[&run]);

        assert!(matches!(
            ensure_meld_valid(&rack, &current, &Board::default()),
            Err(Error::InvalidMeld(_))
        ));
    }

    #[test]
    fn meld_ignores_tilesets_already_on_the_board() {
        // The run was already on the board at the start of the turn; only
        // the group of 10s is new, and 30 is exactly enough.
        let previous = board(&[&[0, 1, 2]]);
        let current = board(&[&[0, 1, 2], &[9, 22, 35]]);
        let rack = tiles(&[9, 22, 35]);

        assert!(ensure_meld_valid(&rack, &current, &previous).is_ok());
    }

    #[test]
    fn board_validity_requires_dictionary_legal_tilesets() {
        let mut rng = GameRng::seeded(0);
        let gameroom = full_gameroom(2);
        let game = create_game(&gameroom, &mut rng).unwrap();
        let player = game.current_player().unwrap().clone();

        // Play the first three rack tiles as one set, legal or not.
        let played: Vec<u8> = player.rack.tiles()[..3]
            .iter()
            .map(|tile| tile.id())
            .collect();
        let rack: Tileset = player.rack.tiles()[3..].iter().copied().collect();
        let game = game
            .with_new_move(rack, board(&[&played]), &player)
            .unwrap();

        let result = ensure_board_valid(&game);
        let legal = DICTIONARY.is_valid(&tiles(&played));
        assert_eq!(legal, result.is_ok());
    }

    #[test]
    fn board_validity_requires_new_tiles() {
        let mut rng = GameRng::seeded(0);
        let gameroom = full_gameroom(2);
        let game = create_game(&gameroom, &mut rng).unwrap();

        assert!(matches!(
            ensure_board_valid(&game),
            Err(Error::NoNewTiles(_))
        ));
    }
}
