//! Launch Board State
//!
//! 화면에 보이는 로컬 상태. 저장소 레코드는 수집 시점에 한 번만 `CellKey`로
//! 해석하고, 이후 조회는 정규 키 → 레거시 키 순서로 찾습니다.

use std::collections::HashMap;

use crate::keys::CellKey;
use crate::models::{CellState, LaunchCategory, LaunchProject, LaunchStatus, LaunchStatusRecord, Phase};
use crate::outbox::OutboxOp;

#[derive(Debug, Clone, Default)]
pub struct LaunchBoard {
    cells: HashMap<CellKey, CellState>,
    projects: Vec<LaunchProject>,
}

impl LaunchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = LaunchStatusRecord>) -> Self {
        let mut board = Self::new();
        board.replace_records(records);
        board
    }

    /// 저장소 스냅샷으로 셀 전체 교체
    ///
    /// 같은 키의 레코드가 여러 개면 timestamp가 가장 큰 것(동률이면 나중 것)을 씁니다.
    pub fn replace_records(&mut self, records: impl IntoIterator<Item = LaunchStatusRecord>) {
        let mut latest: HashMap<CellKey, (i64, CellState)> = HashMap::new();

        for record in records {
            let key = CellKey::parse(&record.key).or_else(|| {
                CellKey::from_fields(&record.project_id, record.category.as_deref(), &record.platform_id)
            });
            let Some(key) = key else {
                tracing::warn!("[Board] skipping record with unusable key {:?}", record.key);
                continue;
            };

            let replace = latest
                .get(&key)
                .map(|(ts, _)| record.timestamp >= *ts)
                .unwrap_or(true);
            if replace {
                latest.insert(key, (record.timestamp, record.cell()));
            }
        }

        self.cells = latest.into_iter().map(|(k, (_, cell))| (k, cell)).collect();
    }

    pub fn replace_projects(&mut self, projects: Vec<LaunchProject>) {
        self.projects = projects;
    }

    /// 유효 상태: 정규 키 → 레거시 키 → 기본값
    pub fn effective(&self, key: &CellKey) -> CellState {
        if let Some(cell) = self.cells.get(key) {
            return cell.clone();
        }
        if !key.is_legacy() {
            if let Some(cell) = self.cells.get(&key.to_legacy()) {
                return cell.clone();
            }
        }
        CellState::default()
    }

    pub fn get(&self, key: &CellKey) -> Option<&CellState> {
        self.cells.get(key)
    }

    /// 로컬 변경 반영
    ///
    /// 기본값(none + 빈 메모)이면 셀을 지우고, 상태가 none이면 레거시 셀도 지웁니다.
    pub fn set(&mut self, key: &CellKey, state: CellState) {
        if state.status == LaunchStatus::None && !key.is_legacy() {
            self.cells.remove(&key.to_legacy());
        }
        if state.is_default() {
            self.cells.remove(key);
        } else {
            self.cells.insert(key.clone(), state);
        }
    }

    /// 정확한 키에 그대로 기록 (레거시 정리 없음)
    pub fn insert(&mut self, key: CellKey, state: CellState) {
        self.cells.insert(key, state);
    }

    pub fn remove(&mut self, key: &CellKey) -> Option<CellState> {
        self.cells.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CellKey, &CellState)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn projects(&self) -> &[LaunchProject] {
        &self.projects
    }

    pub fn upsert_project(&mut self, project: LaunchProject) {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => self.projects.push(project),
        }
    }

    pub fn update_project(&mut self, id: &str, category: LaunchCategory, status: Phase) -> bool {
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.category = category;
                project.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove_project(&mut self, id: &str) -> Option<LaunchProject> {
        let index = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(index))
    }

    /// 아직 저장되지 않은 쓰기를 스냅샷 위에 다시 적용
    pub fn overlay_pending(&mut self, op: &OutboxOp) {
        match op {
            OutboxOp::UpsertStatus { record } => {
                if let Some(key) = CellKey::parse(&record.key) {
                    self.insert(key, record.cell());
                }
            }
            OutboxOp::DeleteStatus { key } => {
                if let Some(key) = CellKey::parse(key) {
                    self.remove(&key);
                }
            }
            OutboxOp::UpdateLaunchProject { id, category, status } => {
                self.update_project(id, *category, *status);
            }
        }
    }
}
