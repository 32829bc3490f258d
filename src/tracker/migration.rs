//! 작품 상태 변경 시 카테고리 이관
//!
//! 완결 ↔ 비완결 전환 시 해당 작품의 런칭 상태 레코드를 새 카테고리 키로 복제합니다.
//! 기존 레코드는 지우지 않고, 런칭 작품 행은 제자리에서 갱신합니다.
//! 전체를 묶는 트랜잭션은 없으며, 실패한 쓰기는 outbox에 남습니다.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::{record_for, LaunchTracker};
use crate::error::{LaunchError, LaunchResult};
use crate::keys::CellKey;
use crate::models::{
    rewrite_category_label, CellState, LaunchProject, LaunchStatusRecord, Project, ProjectStatus,
};
use crate::outbox::{FlushReport, OutboxOp};
use crate::store::Collection;

/// 이관 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub migrated_records: usize,
    pub skipped_legacy: usize,
    pub updated_launch_projects: usize,
    pub flush: FlushReport,
}

impl LaunchTracker {
    /// 작품 상태 변경 (projects 컬렉션 갱신 후 필요하면 이관)
    pub async fn change_project_status(&self, project_id: &str, next: ProjectStatus) -> LaunchResult<MigrationReport> {
        let doc = self
            .store
            .get(Collection::Projects, project_id)
            .await?
            .ok_or_else(|| LaunchError::ProjectNotFound(project_id.to_string()))?;
        let project: Project = doc.decode()?;

        if project.status != next {
            let mut fields = crate::store::Fields::new();
            fields.insert("status".to_string(), json!(next.as_str()));
            self.store.update(Collection::Projects, project_id, fields).await?;
            tracing::info!(
                "[Tracker] project {} status {} -> {}",
                project_id,
                project.status.as_str(),
                next.as_str()
            );
        }

        self.migrate_project_category(project_id, project.status, next).await
    }

    /// 완결 여부가 바뀐 경우에만 이관
    pub async fn migrate_project_category(
        &self,
        project_id: &str,
        previous: ProjectStatus,
        next: ProjectStatus,
    ) -> LaunchResult<MigrationReport> {
        let mut report = MigrationReport::default();
        if previous.is_completed() == next.is_completed() {
            return Ok(report);
        }
        let target = next.phase();

        // 조회 전에 로컬 변경을 먼저 반영. 반영되지 못한 쓰기는 아래에서 덧씌움
        self.flush().await;

        let status_docs = self
            .store
            .find_by(Collection::LaunchStatuses, "projectId", &json!(project_id))
            .await?;
        let project_docs = self
            .store
            .find_by(Collection::LaunchProjects, "projectId", &json!(project_id))
            .await?;

        let mut moved_projects: Vec<LaunchProject> = Vec::new();
        for doc in project_docs {
            let mut project: LaunchProject = match doc.decode() {
                Ok(project) => project,
                Err(e) => {
                    tracing::warn!("[Tracker] skipping undecodable launch project {}: {}", doc.id, e);
                    continue;
                }
            };
            project.id = doc.id;
            let category = project.category.with_phase(target);
            if category == project.category && project.status == target {
                continue;
            }
            project.category = category;
            project.status = target;
            moved_projects.push(project);
        }

        let mut records: BTreeMap<String, LaunchStatusRecord> = BTreeMap::new();
        for doc in status_docs {
            match doc.decode::<LaunchStatusRecord>() {
                Ok(record) => {
                    // 같은 키가 여러 개면 최신 것
                    let newer = records
                        .get(&record.key)
                        .map_or(true, |existing| record.timestamp >= existing.timestamp);
                    if newer {
                        records.insert(record.key.clone(), record);
                    }
                }
                Err(e) => tracing::warn!("[Tracker] skipping undecodable status {}: {}", doc.id, e),
            }
        }

        let migrated = {
            let mut outbox = self.outbox.lock().await;
            let mut board = self.board.write().await;

            // 아직 저장되지 않은 로컬 쓰기가 이 작품의 현재 상태
            for write in outbox.pending() {
                match &write.op {
                    OutboxOp::UpsertStatus { record } if record.project_id == project_id => {
                        records.insert(record.key.clone(), record.clone());
                    }
                    OutboxOp::DeleteStatus { key } => {
                        records.remove(key);
                    }
                    _ => {}
                }
            }

            let mut migrated: Vec<(CellKey, CellState)> = Vec::new();
            for record in records.values() {
                let Some(category) = record.category.as_deref() else {
                    report.skipped_legacy += 1;
                    continue;
                };
                let Some(rewritten) = rewrite_category_label(category, target) else {
                    tracing::warn!("[Tracker] cannot rewrite category {:?} for {}", category, record.key);
                    continue;
                };
                if rewritten == category.trim() {
                    continue;
                }
                migrated.push((
                    CellKey::canonical(&record.project_id, &rewritten, &record.platform_id),
                    record.cell(),
                ));
            }

            for (key, state) in &migrated {
                board.insert(key.clone(), state.clone());
            }
            for project in &moved_projects {
                board.update_project(&project.id, project.category, project.status);
            }

            for (key, state) in &migrated {
                outbox.enqueue(OutboxOp::UpsertStatus {
                    record: record_for(key, state),
                });
            }
            for project in &moved_projects {
                outbox.enqueue(OutboxOp::UpdateLaunchProject {
                    id: project.id.clone(),
                    category: project.category,
                    status: project.status,
                });
            }
            migrated
        };

        report.migrated_records = migrated.len();
        report.updated_launch_projects = moved_projects.len();
        report.flush = self.flush().await;

        tracing::info!(
            "[Tracker] migrated {} statuses / {} launch projects of {} to {}",
            report.migrated_records,
            report.updated_launch_projects,
            project_id,
            target.label()
        );
        Ok(report)
    }
}
