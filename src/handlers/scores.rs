use axum::extract::State;
use std::sync::Arc;

use crate::middleware::{ApiQuery, ApiResponse, ApiResult};
use crate::services::leaderboard::DEFAULT_LIMIT;
use crate::services::RankedScore;
use crate::state::AppState;
use crate::types::TopScoresQuery;

/// GET /api/scores/top - Ranked scores for a game, best first
pub async fn top(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TopScoresQuery>,
) -> ApiResult<Vec<RankedScore>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let ranked = state.leaderboard.top_scores(&query.game_name, limit).await?;
    Ok(ApiResponse::success(ranked))
}
