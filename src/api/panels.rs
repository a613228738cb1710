//! Panel rendering endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Panel, PanelView},
    AppState,
};

/// Data behind one front-end panel
#[utoipa::path(
    get,
    path = "/panels/{panel}",
    tag = "panels",
    params(
        ("panel" = Panel, Path, description = "dashboard, books, members, issue, current or overdue")
    ),
    responses(
        (status = 200, description = "Panel data", body = PanelView),
        (status = 404, description = "Unknown panel")
    )
)]
pub async fn render_panel(
    State(state): State<AppState>,
    Path(panel): Path<String>,
) -> AppResult<Json<PanelView>> {
    let panel: Panel = panel.parse().map_err(AppError::NotFound)?;
    let view = state.services.reports.render(panel).await?;
    Ok(Json(view))
}
