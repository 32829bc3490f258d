//! 런칭 현황 그리드
//!
//! 카테고리 필터 + 제목 검색으로 행(런칭 작품) × 열(플랫폼) 뷰를 만듭니다.

use serde::Serialize;

use super::LaunchTracker;
use crate::catalog::Platform;
use crate::keys::CellKey;
use crate::models::{LaunchCategory, LaunchProject, LaunchStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub platform_id: String,
    pub status: LaunchStatus,
    pub note: String,
}

/// 행별 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub launched: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl StatusSummary {
    fn count(&mut self, status: LaunchStatus) {
        match status {
            LaunchStatus::Launched => self.launched += 1,
            LaunchStatus::Pending => self.pending += 1,
            LaunchStatus::Rejected => self.rejected += 1,
            LaunchStatus::None => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    pub project: LaunchProject,
    pub cells: Vec<GridCell>,
    pub summary: StatusSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchGrid {
    pub category: LaunchCategory,
    pub platforms: Vec<Platform>,
    pub rows: Vec<GridRow>,
}

impl LaunchTracker {
    /// 카테고리 그리드 (query가 있으면 제목 부분 일치, 대소문자 무시)
    pub async fn grid(&self, category: LaunchCategory, query: Option<&str>) -> LaunchGrid {
        let platforms = self.catalog.read().await.for_category(&category).to_vec();
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let board = self.board.read().await;
        let label = category.label();
        let mut projects: Vec<&LaunchProject> = board
            .projects()
            .iter()
            .filter(|p| p.category == category)
            .filter(|p| match &needle {
                Some(needle) => p.title.to_lowercase().contains(needle),
                None => true,
            })
            .collect();
        projects.sort_by(|a, b| a.title.cmp(&b.title));

        let rows = projects
            .into_iter()
            .map(|project| {
                let mut summary = StatusSummary::default();
                let cells = platforms
                    .iter()
                    .map(|platform| {
                        let state = board.effective(&CellKey::canonical(&project.project_id, &label, &platform.id));
                        summary.count(state.status);
                        GridCell {
                            platform_id: platform.id.clone(),
                            status: state.status,
                            note: state.note,
                        }
                    })
                    .collect();
                GridRow {
                    project: project.clone(),
                    cells,
                    summary,
                }
            })
            .collect();

        LaunchGrid {
            category,
            platforms,
            rows,
        }
    }
}
