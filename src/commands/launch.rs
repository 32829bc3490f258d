//! Launch Status Commands
//!
//! 그리드 셀 클릭/메모 편집, 일괄 저장, 대기 중인 쓰기 관리

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::models::{CellState, LaunchCategory};
use crate::outbox::{FlushReport, PendingWrite};
use crate::tracker::{LaunchGrid, SaveSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellArgs {
    pub project_id: String,
    pub category: String,
    pub platform_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteArgs {
    pub project_id: String,
    pub category: String,
    pub platform_id: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridArgs {
    pub category: LaunchCategory,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushArgs {
    /// 포기한 쓰기도 다시 시도
    #[serde(default)]
    pub retry_dead_letters: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrites {
    pub pending: Vec<PendingWrite>,
    pub dead_letters: Vec<PendingWrite>,
}

/// 좌클릭: launched ↔ none
pub async fn toggle_launch_status(args: CellArgs, state: &AppState) -> CommandResult<CellState> {
    state
        .tracker
        .toggle_launch(&args.project_id, &args.category, &args.platform_id)
        .await
        .map_err(CommandError::from)
}

/// 우클릭: none → pending → rejected → none
pub async fn cycle_review_status(args: CellArgs, state: &AppState) -> CommandResult<CellState> {
    state
        .tracker
        .cycle_review(&args.project_id, &args.category, &args.platform_id)
        .await
        .map_err(CommandError::from)
}

pub async fn update_launch_note(args: UpdateNoteArgs, state: &AppState) -> CommandResult<CellState> {
    state
        .tracker
        .update_note(&args.project_id, &args.category, &args.platform_id, &args.note)
        .await
        .map_err(CommandError::from)
}

/// 저장 버튼
pub async fn save_all_launch_statuses(state: &AppState) -> CommandResult<SaveSummary> {
    Ok(state.tracker.save_all().await)
}

pub async fn get_launch_grid(args: GridArgs, state: &AppState) -> CommandResult<LaunchGrid> {
    Ok(state.tracker.grid(args.category, args.query.as_deref()).await)
}

pub async fn flush_pending_writes(args: FlushArgs, state: &AppState) -> CommandResult<FlushReport> {
    if args.retry_dead_letters {
        return Ok(state.tracker.retry_dead_letters().await);
    }
    Ok(state.tracker.flush().await)
}

pub async fn list_pending_writes(state: &AppState) -> CommandResult<PendingWrites> {
    Ok(PendingWrites {
        pending: state.tracker.pending_writes().await,
        dead_letters: state.tracker.dead_letters().await,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::AppConfig;
    use crate::models::LaunchStatus;

    fn cell_args(platform: &str) -> CellArgs {
        serde_json::from_value(json!({
            "projectId": "proj1",
            "category": "국내비독점 [라이브]",
            "platformId": platform
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_cell_commands() {
        let state = AppState::start(AppConfig::in_memory()).await.unwrap();

        let cell = toggle_launch_status(cell_args("lezhin"), &state).await.unwrap();
        assert_eq!(cell.status, LaunchStatus::Launched);
        let cell = cycle_review_status(cell_args("lezhin"), &state).await.unwrap();
        assert_eq!(cell.status, LaunchStatus::Pending);

        let args: UpdateNoteArgs = serde_json::from_value(json!({
            "projectId": "proj1",
            "category": "국내비독점 [라이브]",
            "platformId": "lezhin",
            "note": "심사 중"
        }))
        .unwrap();
        let cell = update_launch_note(args, &state).await.unwrap();
        assert_eq!(cell, CellState::new(LaunchStatus::Pending, "심사 중"));

        let summary = save_all_launch_statuses(&state).await.unwrap();
        assert_eq!(summary.upserted, 1);

        let pending = list_pending_writes(&state).await.unwrap();
        assert!(pending.pending.is_empty());
        assert!(pending.dead_letters.is_empty());
        assert!(flush_pending_writes(FlushArgs::default(), &state).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_invalid_cell_is_reported_as_validation_error() {
        let state = AppState::start(AppConfig::in_memory()).await.unwrap();
        let err = toggle_launch_status(cell_args(""), &state).await.unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_grid_args_parse_category_label() {
        let state = AppState::start(AppConfig::in_memory()).await.unwrap();
        let args: GridArgs = serde_json::from_value(json!({ "category": "해외비독점 [라이브]" })).unwrap();
        let grid = get_launch_grid(args, &state).await.unwrap();
        assert_eq!(grid.platforms.len(), 18);
        assert!(grid.rows.is_empty());

        assert!(serde_json::from_value::<GridArgs>(json!({ "category": "웹소설" })).is_err());
    }
}
