//! Top scores for a game.
//!
//! The ranking walks four dependent lookups: game by name, the game's sessions,
//! the scores attached to those sessions, and finally the score rows ordered by
//! value. An empty result at any step is a distinct error rather than an empty
//! leaderboard.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::backend::query::scalar_text;
use crate::backend::{Row, RowQuery, SortDirection};
use crate::services::data_service::{DataError, DataService};

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("Game not found.")]
    GameNotFound,

    #[error("No sessions found for the game.")]
    NoSessions,

    #[error("No scores found for the sessions.")]
    NoSessionScores,

    #[error("No scores found.")]
    NoScores,

    #[error("The leaderboard query failed.")]
    Data(#[from] DataError),
}

impl LeaderboardError {
    /// Longer explanation sent next to the message.
    pub fn details(&self) -> Value {
        match self {
            LeaderboardError::GameNotFound => "No game exists with the given name.".into(),
            LeaderboardError::NoSessions => "There are no sessions associated with this game.".into(),
            LeaderboardError::NoSessionScores => "There are no scores associated with the sessions found.".into(),
            LeaderboardError::NoScores => "There are no scores available for the given ids.".into(),
            LeaderboardError::Data(e) => e.details().cloned().unwrap_or_else(|| e.to_string().into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScore {
    pub position: usize,
    pub score_value: Value,
    pub score_name: Value,
}

#[derive(Clone)]
pub struct LeaderboardService {
    data: DataService,
}

impl LeaderboardService {
    pub fn new(data: DataService) -> Self {
        Self { data }
    }

    pub async fn top_scores(&self, game_name: &str, limit: usize) -> Result<Vec<RankedScore>, LeaderboardError> {
        let result = self.run(game_name, limit.max(1)).await;
        if let Err(e) = &result {
            tracing::warn!(game_name = %game_name, error = %e, "Leaderboard lookup stopped");
        }
        result
    }

    async fn run(&self, game_name: &str, limit: usize) -> Result<Vec<RankedScore>, LeaderboardError> {
        let game_id = self.game_id(game_name).await?;
        let session_ids = self.session_ids(game_id).await?;
        let score_ids = self.score_ids(session_ids).await?;
        let scores = self.scores(score_ids, limit).await?;
        Ok(rank(scores))
    }

    async fn game_id(&self, game_name: &str) -> Result<Value, LeaderboardError> {
        let rows = self
            .data
            .fetch(RowQuery::select("games", ["game_id"]).eq("game_name", game_name))
            .await?;
        column_values(&rows, "game_id")
            .into_iter()
            .next()
            .ok_or(LeaderboardError::GameNotFound)
    }

    async fn session_ids(&self, game_id: Value) -> Result<Vec<Value>, LeaderboardError> {
        let rows = self
            .data
            .fetch(RowQuery::select("games_sessions", ["session_id"]).eq("game_id", game_id))
            .await?;
        non_empty(column_values(&rows, "session_id"), LeaderboardError::NoSessions)
    }

    async fn score_ids(&self, session_ids: Vec<Value>) -> Result<Vec<Value>, LeaderboardError> {
        let rows = self
            .data
            .fetch(RowQuery::select("sessions_scores", ["score_id"]).in_("session_id", session_ids))
            .await?;
        non_empty(column_values(&rows, "score_id"), LeaderboardError::NoSessionScores)
    }

    async fn scores(&self, score_ids: Vec<Value>, limit: usize) -> Result<Vec<Row>, LeaderboardError> {
        let rows = self
            .data
            .fetch(
                RowQuery::select("scores", ["score_value", "score_name"])
                    .in_("score_id", score_ids)
                    .order("score_value", SortDirection::Desc)
                    .limit(limit),
            )
            .await?;
        non_empty(rows, LeaderboardError::NoScores)
    }
}

fn non_empty<T>(items: Vec<T>, err: LeaderboardError) -> Result<Vec<T>, LeaderboardError> {
    if items.is_empty() {
        Err(err)
    } else {
        Ok(items)
    }
}

/// Distinct non-null values of `column`, first occurrence wins. Keys compare by
/// text form, as the store's `in` filter does.
fn column_values(rows: &[Row], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null() && seen.insert(scalar_text(value)))
        .cloned()
        .collect()
}

/// Rows arrive already ordered by the store; ties keep the store's order.
fn rank(rows: Vec<Row>) -> Vec<RankedScore> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, mut row)| RankedScore {
            position: idx + 1,
            score_value: row.remove("score_value").unwrap_or(Value::Null),
            score_name: row.remove("score_name").unwrap_or(Value::Null),
        })
        .collect()
}
