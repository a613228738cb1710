//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::report::{ActivityEntry, ActivityQuery, DashboardStats, OverdueReminder},
    AppState,
};

const DEFAULT_ACTIVITY_LIMIT: usize = 5;

/// Dashboard totals and breakdowns
#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "reports",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats)
    )
)]
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.reports.dashboard().await?;
    Ok(Json(stats))
}

/// Most recent issuances and returns
#[utoipa::path(
    get,
    path = "/reports/activity",
    tag = "reports",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Recent ledger events, newest first", body = Vec<ActivityEntry>)
    )
)]
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let activity = state.services.reports.recent_activity(limit).await?;
    Ok(Json(activity))
}

/// Overdue notices for every late loan
#[utoipa::path(
    get,
    path = "/reports/reminders",
    tag = "reports",
    responses(
        (status = 200, description = "One reminder per overdue loan", body = Vec<OverdueReminder>)
    )
)]
pub async fn overdue_reminders(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OverdueReminder>>> {
    let reminders = state.services.reports.overdue_reminders().await?;
    Ok(Json(reminders))
}
