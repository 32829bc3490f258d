//! Launch Board - 플랫폼 런칭 현황 백엔드 라이브러리
//!
//! 웹툰 작품별 플랫폼 런칭 상태를 문서 저장소와 동기화합니다.
//! 저장소(메모리/SQLite/Firestore) 선택, 트래커 구성, 백그라운드 작업 기동을 담당합니다.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod firestore;
pub mod keys;
pub mod models;
pub mod outbox;
pub mod store;
pub mod tasks;
pub mod tracker;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::catalog::PlatformCatalog;
use crate::config::{AppConfig, StoreBackend};
use crate::db::SqliteStore;
use crate::error::{LaunchError, LaunchResult};
use crate::firestore::FirestoreStore;
use crate::store::{DocumentStore, MemoryStore};
use crate::tasks::BackgroundTask;
use crate::tracker::LaunchTracker;

static TRACING: OnceCell<()> = OnceCell::new();

/// 로그 출력 설정 (`RUST_LOG`, 기본 info). 여러 번 호출해도 한 번만 설치
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // 다른 구독자가 이미 설치돼 있으면 그대로 사용
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// 앱 상태: 설정, 트래커, 실행 중인 백그라운드 작업
///
/// drop하면 백그라운드 작업(구독, 폴링, 재시도)이 모두 중단됩니다.
pub struct AppState {
    pub config: AppConfig,
    pub tracker: Arc<LaunchTracker>,
    tasks: Vec<BackgroundTask>,
}

impl AppState {
    /// 저장소 연결 → 초기 로드 → 구독/재시도 작업 시작
    pub async fn start(config: AppConfig) -> LaunchResult<Self> {
        config.validate()?;
        let mut tasks = Vec::new();
        let store = open_store(&config, &mut tasks)?;

        let tracker = Arc::new(LaunchTracker::new(
            store,
            PlatformCatalog::default(),
            config.outbox_max_attempts,
        ));
        if let Err(e) = tracker.reload().await {
            tracing::warn!("[App] initial load failed: {}", e);
        }

        tasks.push(tracker.watch());
        tasks.push(tracker.spawn_flusher(config.flush_interval));

        tracing::info!(
            "[App] started with {:?} store ({} background tasks)",
            config.backend,
            tasks.len()
        );
        Ok(Self { config, tracker, tasks })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &BackgroundTask> {
        self.tasks.iter()
    }

    /// 남은 쓰기를 반영하고 백그라운드 작업 중단
    pub async fn shutdown(self) {
        let report = self.tracker.flush().await;
        if !report.is_clean() {
            tracing::warn!(
                "[App] shutting down with {} unsaved writes",
                report.retained + report.dead_lettered
            );
        }
        for task in self.tasks {
            task.detach();
        }
    }
}

fn open_store(config: &AppConfig, tasks: &mut Vec<BackgroundTask>) -> LaunchResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            if let Some(parent) = config.db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let db = SqliteStore::new(&config.db_path)?;
            db.initialize()?;
            tracing::info!("[App] sqlite store at {}", config.db_path.display());
            Ok(Arc::new(db))
        }
        StoreBackend::Firestore => {
            let settings = config
                .firestore
                .as_ref()
                .ok_or_else(|| LaunchError::Config("firestore settings missing".to_string()))?;
            let store = Arc::new(FirestoreStore::new(settings));
            tasks.push(store.spawn_poller(config.poll_interval));
            tracing::info!("[App] firestore store for project {}", settings.project_id);
            Ok(store)
        }
    }
}

/// 환경 설정을 읽어 앱 시작
pub async fn run() -> LaunchResult<AppState> {
    init_tracing();
    let config = AppConfig::load()?;
    AppState::start(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LaunchStatus;

    #[tokio::test]
    async fn test_start_with_memory_store() {
        init_tracing();
        init_tracing();

        let state = AppState::start(AppConfig::in_memory()).await.unwrap();
        let names: Vec<&str> = state.tasks().map(|t| t.name()).collect();
        assert_eq!(names, vec!["launch-watch", "outbox-flusher"]);
        assert!(state.tasks().all(|t| !t.is_finished()));
        assert!(!state.tracker.is_loading());

        let cell = state
            .tracker
            .toggle_launch("proj1", "국내비독점 [라이브]", "lezhin")
            .await
            .unwrap();
        assert_eq!(cell.status, LaunchStatus::Launched);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_with_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            backend: StoreBackend::Sqlite,
            db_path: dir.path().join("nested").join("launch.db"),
            ..AppConfig::default()
        };

        let state = AppState::start(config).await.unwrap();
        state
            .tracker
            .cycle_review("proj1", "해외비독점 [완결]", "tapas")
            .await
            .unwrap();
        assert!(state.tracker.pending_writes().await.is_empty());
        assert!(dir.path().join("nested").join("launch.db").exists());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected_before_tasks_start() {
        let config = AppConfig {
            flush_interval: std::time::Duration::ZERO,
            ..AppConfig::in_memory()
        };
        assert!(matches!(AppState::start(config).await, Err(LaunchError::Config(_))));
    }
}
