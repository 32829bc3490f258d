//! 런칭 작품 관리
//!
//! 작품 × 카테고리당 한 행. 입력 검증 실패는 저장소에 접근하지 않고 바로 반환합니다.

use serde_json::json;

use super::LaunchTracker;
use crate::error::{LaunchError, LaunchResult};
use crate::keys::CANONICAL_SEPARATOR;
use crate::models::{LaunchCategory, LaunchProject};
use crate::store::{to_fields, Collection};

impl LaunchTracker {
    /// 런칭 트래킹 대상 추가
    pub async fn add_launch_project(
        &self,
        title: &str,
        category: LaunchCategory,
        project_id: &str,
    ) -> LaunchResult<LaunchProject> {
        let title = title.trim();
        let project_id = project_id.trim();
        if title.is_empty() {
            return Err(LaunchError::validation("작품명을 입력해주세요."));
        }
        if project_id.is_empty() {
            return Err(LaunchError::validation("연결할 작품을 선택해주세요."));
        }
        if project_id.contains(CANONICAL_SEPARATOR) {
            return Err(LaunchError::InvalidKey(project_id.to_string()));
        }

        let existing = self
            .store
            .find_by(Collection::LaunchProjects, "projectId", &json!(project_id))
            .await?;
        let duplicate = existing
            .iter()
            .filter_map(|doc| doc.decode::<LaunchProject>().ok())
            .any(|p| p.category == category);
        if duplicate {
            return Err(LaunchError::validation(format!(
                "이미 {} 카테고리에 등록된 작품입니다.",
                category
            )));
        }

        let mut project = LaunchProject {
            id: String::new(),
            title: title.to_string(),
            category,
            status: category.phase,
            project_id: project_id.to_string(),
        };
        project.id = self
            .store
            .create(Collection::LaunchProjects, to_fields(&project)?)
            .await?;
        self.mark_landed();
        self.board.write().await.upsert_project(project.clone());
        tracing::info!("[Tracker] launch project added: {} ({})", project.title, category);
        Ok(project)
    }

    /// 런칭 작품 행 삭제 (런칭 상태 레코드는 남김)
    pub async fn remove_launch_project(&self, id: &str) -> LaunchResult<()> {
        if self.store.get(Collection::LaunchProjects, id).await?.is_none() {
            return Err(LaunchError::LaunchProjectNotFound(id.to_string()));
        }
        self.store.delete(Collection::LaunchProjects, id).await?;
        self.mark_landed();
        self.board.write().await.remove_project(id);
        Ok(())
    }

    /// 카테고리별 런칭 작품 목록 (제목순)
    pub async fn list_launch_projects(&self, category: Option<LaunchCategory>) -> Vec<LaunchProject> {
        let board = self.board.read().await;
        let mut projects: Vec<LaunchProject> = board
            .projects()
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.title.cmp(&b.title));
        projects
    }
}
