//! Launch Status Tracker
//!
//! 런칭 현황 그리드의 상태 조정기. 셀 상태 전이, 저장소 쓰기(outbox 경유),
//! 작품 상태 변경에 따른 카테고리 이관, 일괄 저장, 실시간 갱신을 담당합니다.

pub mod board;
mod cells;
pub mod grid;
mod migration;
mod projects;
mod watch;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::catalog::{Platform, PlatformCatalog};
use crate::error::{LaunchError, LaunchResult};
use crate::keys::{CellKey, CANONICAL_SEPARATOR};
use crate::models::{CellState, LaunchStatusRecord, Region};
use crate::outbox::{FlushReport, Outbox, PendingWrite};
use crate::store::DocumentStore;

pub use board::LaunchBoard;
pub use cells::SaveSummary;
pub use grid::{GridCell, GridRow, LaunchGrid, StatusSummary};
pub use migration::MigrationReport;

/// 런칭 현황 트래커
///
/// 잠금 순서는 outbox → board. 두 잠금 모두 저장소 I/O 동안에는 잡지 않습니다.
pub struct LaunchTracker {
    store: Arc<dyn DocumentStore>,
    board: RwLock<LaunchBoard>,
    outbox: Mutex<Outbox>,
    /// flush는 한 번에 하나만
    flushing: Mutex<()>,
    /// 저장소에 반영된 로컬 쓰기 횟수 (reload가 스냅샷 유효성 확인에 사용)
    landed: AtomicU64,
    catalog: RwLock<PlatformCatalog>,
    loading: AtomicBool,
}

impl LaunchTracker {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: PlatformCatalog, outbox_max_attempts: u32) -> Self {
        Self {
            store,
            board: RwLock::new(LaunchBoard::new()),
            outbox: Mutex::new(Outbox::new(outbox_max_attempts)),
            flushing: Mutex::new(()),
            landed: AtomicU64::new(0),
            catalog: RwLock::new(catalog),
            loading: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// 현재 로컬 상태 스냅샷
    pub async fn board(&self) -> LaunchBoard {
        self.board.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// 셀의 유효 상태 (정규 키 → 레거시 키 → 기본값)
    pub async fn effective_cell(&self, project_id: &str, category: &str, platform_id: &str) -> LaunchResult<CellState> {
        let key = cell_key(project_id, category, platform_id)?;
        Ok(self.board.read().await.effective(&key))
    }

    /// 대기 중인 쓰기를 저장소에 반영. 실패는 로그만 남기고 큐에 유지
    ///
    /// 다른 flush가 진행 중이면 끝날 때까지 기다립니다.
    pub async fn flush(&self) -> FlushReport {
        let report = {
            let _flushing = self.flushing.lock().await;
            self.flush_round().await
        };
        self.write_through().await;
        report
    }

    /// 로컬 변경 직후 호출. 진행 중인 flush가 있으면 기다리지 않고 그쪽에 맡김
    pub(crate) async fn write_through(&self) {
        while self.outbox.lock().await.has_fresh() {
            let Ok(_flushing) = self.flushing.try_lock() else {
                // 진행 중인 flush가 끝나면서 다시 확인함
                return;
            };
            self.flush_round().await;
        }
    }

    async fn flush_round(&self) -> FlushReport {
        let batch = self.outbox.lock().await.take_batch();
        if batch.is_empty() {
            return FlushReport::default();
        }
        let outcome = batch.apply(self.store.as_ref()).await;
        let report = {
            let mut outbox = self.outbox.lock().await;
            let report = outbox.complete(outcome);
            // outbox에서 빠지는 것과 같은 잠금 아래에서 기록
            if report.applied > 0 {
                self.landed.fetch_add(1, Ordering::SeqCst);
            }
            report
        };
        if !report.is_clean() {
            tracing::warn!(
                "[Tracker] flush incomplete: {} applied, {} pending, {} dead",
                report.applied,
                report.retained,
                report.dead_lettered
            );
        }
        report
    }

    /// 로컬에서 저장소에 직접 쓴 경우 (outbox를 거치지 않는 쓰기)
    pub(crate) fn mark_landed(&self) {
        self.landed.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn pending_writes(&self) -> Vec<PendingWrite> {
        self.outbox.lock().await.pending().cloned().collect()
    }

    pub async fn dead_letters(&self) -> Vec<PendingWrite> {
        self.outbox.lock().await.dead_letters().to_vec()
    }

    /// 포기한 쓰기를 다시 시도
    pub async fn retry_dead_letters(&self) -> FlushReport {
        let requeued = self.outbox.lock().await.requeue_dead_letters();
        if requeued > 0 {
            tracing::info!("[Tracker] requeued {} dead letters", requeued);
        }
        self.flush().await
    }

    pub async fn platforms(&self, region: Region) -> Vec<Platform> {
        self.catalog.read().await.platforms(region).to_vec()
    }

    pub async fn add_platform(&self, region: Region, id: &str, display_name: &str) -> LaunchResult<Platform> {
        let mut catalog = self.catalog.write().await;
        let platform = catalog.add_platform(region, id, display_name)?.clone();
        tracing::info!("[Tracker] platform added: {} ({})", platform.id, platform.display_name);
        Ok(platform)
    }
}

/// 입력값 검증 후 정규 셀 키 생성
pub(crate) fn cell_key(project_id: &str, category: &str, platform_id: &str) -> LaunchResult<CellKey> {
    let project_id = project_id.trim();
    let platform_id = platform_id.trim();
    if project_id.is_empty() || platform_id.is_empty() || category.trim().is_empty() {
        return Err(LaunchError::validation("작품, 카테고리, 플랫폼을 모두 지정해야 합니다."));
    }
    for part in [project_id, category, platform_id] {
        if part.contains(CANONICAL_SEPARATOR) {
            return Err(LaunchError::InvalidKey(format!(
                "'{}' contains the key separator {}",
                part, CANONICAL_SEPARATOR
            )));
        }
    }
    Ok(CellKey::canonical(project_id, category, platform_id))
}

/// 셀 키/상태로 저장 레코드 구성
pub(crate) fn record_for(key: &CellKey, state: &CellState) -> LaunchStatusRecord {
    LaunchStatusRecord {
        key: key.to_string(),
        project_id: key.project_id().to_string(),
        platform_id: key.platform_id().to_string(),
        category: key.category().map(String::from),
        status: state.status,
        note: state.note.clone(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    }
}
