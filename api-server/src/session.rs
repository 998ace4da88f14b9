use std::path::Path;

use serde::{Deserialize, Serialize};

use helicarrier_core::{Avenger, Board, BoardRecord, EngineError, FireResponse, Shot};

use crate::store::Storage;

pub(crate) const MAX_ATTEMPTS: u32 = 9_999;
pub(crate) const MAPS_PER_GAME: u32 = 200;

/// Per-token counters, persisted under `user:<token>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct UserData {
    pub attempts: u32,
    pub last_map_id: u64,
    pub remaining_map_count_in_game: u32,
    pub best_score: u32,
    pub current_game_score: u32,
}

impl UserData {
    fn new() -> Self {
        UserData {
            attempts: 0,
            last_map_id: 0,
            remaining_map_count_in_game: MAPS_PER_GAME,
            best_score: 0,
            current_game_score: 0,
        }
    }
}

/// What a fire-family route asks the engine to do.
pub(crate) enum FireAction {
    Status,
    Shot {
        x: i32,
        y: i32,
        avenger: Option<Avenger>,
    },
}

/// Failure with the HTTP status it maps to.
pub(crate) struct SessionFailure {
    pub status: u16,
    pub message: String,
}

impl SessionFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        SessionFailure {
            status: 400,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        SessionFailure {
            status: 500,
            message: message.into(),
        }
    }

    fn from_engine(err: EngineError) -> Self {
        match err {
            EngineError::OutOfBounds { .. } | EngineError::AvengerUnavailable => {
                SessionFailure::bad_request(err.to_string())
            }
            EngineError::PlacementConflict | EngineError::Data(_) | EngineError::Fatal(_) => {
                SessionFailure::internal(err.to_string())
            }
        }
    }
}

fn user_key(token: &str) -> String {
    format!("user:{token}")
}

fn map_key(token: &str) -> String {
    format!("map:{token}")
}

fn load_user(store: &dyn Storage, token: &str) -> Result<UserData, SessionFailure> {
    match store.get(&user_key(token)).map_err(SessionFailure::internal)? {
        Some(blob) => serde_json::from_str(&blob)
            .map_err(|e| SessionFailure::internal(format!("corrupt user data: {e}"))),
        None => Ok(UserData::new()),
    }
}

fn save_user(store: &dyn Storage, token: &str, user: &UserData) -> Result<(), SessionFailure> {
    let blob = serde_json::to_string(user)
        .map_err(|e| SessionFailure::internal(format!("failed to encode user data: {e}")))?;
    store.set(&user_key(token), &blob).map_err(SessionFailure::internal)
}

fn load_board(store: &dyn Storage, token: &str) -> Result<Option<Board>, SessionFailure> {
    let Some(blob) = store.get(&map_key(token)).map_err(SessionFailure::internal)? else {
        return Ok(None);
    };
    let record: BoardRecord = serde_json::from_str(&blob)
        .map_err(|e| SessionFailure::internal(format!("corrupt board data: {e}")))?;
    Board::from_record(record)
        .map(Some)
        .map_err(|e| SessionFailure::internal(e.to_string()))
}

fn save_board(store: &dyn Storage, token: &str, board: &Board) -> Result<(), SessionFailure> {
    let blob = serde_json::to_string(&board.to_record())
        .map_err(|e| SessionFailure::internal(format!("failed to encode board: {e}")))?;
    store.set(&map_key(token), &blob).map_err(SessionFailure::internal)
}

/// Pre-recorded board for an id, if the map directory carries one.
fn recorded_board(map_dir: &Path, id: u64) -> Option<Board> {
    let path = map_dir.join(format!("map-{id}.json"));
    let blob = std::fs::read_to_string(&path).ok()?;
    let record: BoardRecord = match serde_json::from_str(&blob) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(path = %path.display(), "unreadable recorded board: {e}");
            return None;
        }
    };
    match Board::from_record(record) {
        Ok(board) => Some(board),
        Err(e) => {
            tracing::warn!(path = %path.display(), "invalid recorded board: {e}");
            None
        }
    }
}

fn new_board(map_dir: Option<&Path>, id: u64) -> Board {
    if let Some(dir) = map_dir {
        if let Some(board) = recorded_board(dir, id) {
            tracing::info!(map_id = id, "loaded recorded board");
            return board;
        }
    }
    Board::place_random(id, &mut rand::thread_rng())
}

/// Run one fire-family action for a token: load state, mutate, persist,
/// shape the response. The caller holds the per-token lock.
pub(crate) fn execute_fire(
    store: &dyn Storage,
    map_dir: Option<&Path>,
    token: &str,
    action: FireAction,
) -> Result<FireResponse, SessionFailure> {
    let mut user = load_user(store, token)?;
    user.attempts += 1;
    if user.attempts > MAX_ATTEMPTS {
        return Err(SessionFailure::bad_request("attempt limit reached"));
    }

    let mut board = match load_board(store, token)? {
        Some(board) => board,
        None => {
            let id = user.last_map_id + 1;
            user.last_map_id = id;
            let board = new_board(map_dir, id);
            tracing::info!(map_id = id, moves = 0, "board created");
            board
        }
    };

    let (shot, reveals) = match action {
        FireAction::Status => (None, None),
        FireAction::Shot { x, y, avenger } => match avenger {
            None => {
                let shot = board.fire(x, y).map_err(SessionFailure::from_engine)?;
                (Some(shot), None)
            }
            Some(avenger) => {
                let (shot, reveals) = board
                    .fire_avenger(x, y, avenger, &mut rand::thread_rng())
                    .map_err(SessionFailure::from_engine)?;
                (Some(shot), Some(reveals))
            }
        },
    };

    let finished = board.all_discovered();
    if finished {
        user.current_game_score += board.move_count();
        user.remaining_map_count_in_game = user.remaining_map_count_in_game.saturating_sub(1);
        tracing::info!(
            map_id = board.id(),
            moves = board.move_count(),
            remaining = user.remaining_map_count_in_game,
            "board completed"
        );
        if user.remaining_map_count_in_game == 0 {
            if user.best_score == 0 || user.current_game_score < user.best_score {
                user.best_score = user.current_game_score;
            }
            tracing::info!(
                score = user.current_game_score,
                best = user.best_score,
                "game completed"
            );
            user.current_game_score = 0;
            user.remaining_map_count_in_game = MAPS_PER_GAME;
        }
        store
            .delete(&map_key(token))
            .map_err(SessionFailure::internal)?;
    } else {
        save_board(store, token, &board)?;
    }
    save_user(store, token, &user)?;

    Ok(build_response(&board, &user, shot, reveals, finished))
}

fn build_response(
    board: &Board,
    user: &UserData,
    shot: Option<Shot>,
    reveals: Option<Vec<helicarrier_core::AvengerReveal>>,
    finished: bool,
) -> FireResponse {
    FireResponse {
        grid: board.render_grid(),
        cell: match shot {
            Some(shot) => shot.cell.to_wire().to_string(),
            None => String::new(),
        },
        result: shot.map(|s| !s.repeat).unwrap_or(false),
        avenger_available: board.avenger_available(),
        map_id: board.id(),
        map_count: user.remaining_map_count_in_game,
        move_count: board.move_count(),
        finished,
        avenger_result: reveals.map(|reveals| {
            reveals
                .into_iter()
                .map(helicarrier_core::AvengerResult::from_reveal)
                .collect()
        }),
    }
}

/// Delete the ongoing board; with `wipe`, the user record too.
pub(crate) fn execute_reset(
    store: &dyn Storage,
    token: &str,
    wipe: bool,
) -> Result<bool, SessionFailure> {
    let deleted = store
        .delete(&map_key(token))
        .map_err(SessionFailure::internal)?;
    if wipe {
        store
            .delete(&user_key(token))
            .map_err(SessionFailure::internal)?;
    }
    Ok(deleted)
}
