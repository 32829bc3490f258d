//! Project Commands
//!
//! 런칭 작품 행 관리, 작품 상태 변경, 플랫폼 목록

use serde::Deserialize;

use crate::catalog::Platform;
use crate::error::{CommandError, CommandResult};
use crate::models::{LaunchCategory, LaunchProject, ProjectStatus, Region};
use crate::tracker::MigrationReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLaunchProjectArgs {
    pub title: String,
    pub category: LaunchCategory,
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLaunchProjectArgs {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLaunchProjectsArgs {
    #[serde(default)]
    pub category: Option<LaunchCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProjectStatusArgs {
    pub project_id: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlatformsArgs {
    pub region: Region,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlatformArgs {
    pub region: Region,
    pub id: String,
    pub display_name: String,
}

/// 런칭 작품 추가
pub async fn add_launch_project(args: AddLaunchProjectArgs, state: &AppState) -> CommandResult<LaunchProject> {
    state
        .tracker
        .add_launch_project(&args.title, args.category, &args.project_id)
        .await
        .map_err(CommandError::from)
}

pub async fn remove_launch_project(args: RemoveLaunchProjectArgs, state: &AppState) -> CommandResult<()> {
    state
        .tracker
        .remove_launch_project(&args.id)
        .await
        .map_err(CommandError::from)
}

pub async fn list_launch_projects(args: ListLaunchProjectsArgs, state: &AppState) -> CommandResult<Vec<LaunchProject>> {
    Ok(state.tracker.list_launch_projects(args.category).await)
}

/// 작품 상태 변경 (완결 전환 시 런칭 현황 이관 포함)
pub async fn change_project_status(
    args: ChangeProjectStatusArgs,
    state: &AppState,
) -> CommandResult<MigrationReport> {
    state
        .tracker
        .change_project_status(&args.project_id, args.status)
        .await
        .map_err(CommandError::from)
}

pub async fn list_platforms(args: ListPlatformsArgs, state: &AppState) -> CommandResult<Vec<Platform>> {
    Ok(state.tracker.platforms(args.region).await)
}

pub async fn add_platform(args: AddPlatformArgs, state: &AppState) -> CommandResult<Platform> {
    state
        .tracker
        .add_platform(args.region, &args.id, &args.display_name)
        .await
        .map_err(CommandError::from)
}
