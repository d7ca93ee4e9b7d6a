//! Usage statistics handlers

use crate::api::handlers::header_actor;
use crate::api::models::{DaysQuery, StatsSummary, UserQuery};
use crate::error::Result;
use crate::gateway::resolve_actor;
use crate::storage::{ActorRequests, UsageAggregate};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_RECENT_DAYS: u32 = 7;
const DEFAULT_TOP_DAYS: u32 = 30;

/// Daily usage rows for one actor, newest first
#[utoipa::path(
    get,
    path = "/v1/stats/user",
    tag = "Statistics",
    params(UserQuery, ("X-User-ID" = Option<String>, Header, description = "Caller identity")),
    responses((status = 200, description = "Usage rows", body = [UsageAggregate]))
)]
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UsageAggregate>>> {
    let actor = resolve_actor([query.user.as_deref(), header_actor(&headers)]);
    debug!(actor = %actor, "Retrieving usage stats");

    Ok(Json(state.usage.actor_history(&actor).await?))
}

/// Usage rows for all actors within the last `days` days
#[utoipa::path(
    get,
    path = "/v1/stats/recent",
    tag = "Statistics",
    params(DaysQuery),
    responses((status = 200, description = "Usage rows", body = [UsageAggregate]))
)]
pub async fn recent_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<UsageAggregate>>> {
    let days = query.days.unwrap_or(DEFAULT_RECENT_DAYS);
    Ok(Json(state.usage.recent(days).await?))
}

/// Totals and top actors over a period
#[utoipa::path(
    get,
    path = "/v1/stats/summary",
    tag = "Statistics",
    params(DaysQuery),
    responses((status = 200, description = "Usage summary", body = StatsSummary))
)]
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<StatsSummary>> {
    let days = query.days.unwrap_or(DEFAULT_RECENT_DAYS);

    Ok(Json(StatsSummary {
        total_requests: state.usage.total_requests(days).await?,
        total_tokens: state.usage.total_tokens(days).await?,
        top_users: state.usage.top_actors(days).await?,
        period: format!("{} days", days),
    }))
}

/// Actors ranked by request count
#[utoipa::path(
    get,
    path = "/v1/stats/top-users",
    tag = "Statistics",
    params(DaysQuery),
    responses((status = 200, description = "Ranked actors", body = [ActorRequests]))
)]
pub async fn top_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<ActorRequests>>> {
    let days = query.days.unwrap_or(DEFAULT_TOP_DAYS);
    Ok(Json(state.usage.top_actors(days).await?))
}
