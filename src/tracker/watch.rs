//! 실시간 갱신 구독
//!
//! 저장소 변경 알림이 오면 런칭 상태/작품 전체를 다시 읽어 로컬 상태를 교체합니다.
//! 아직 반영되지 않은 outbox 쓰기는 새 스냅샷 위에 다시 적용합니다.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::LaunchTracker;
use crate::error::LaunchResult;
use crate::models::{LaunchProject, LaunchStatusRecord};
use crate::store::Collection;
use crate::tasks::BackgroundTask;

const SNAPSHOT_ATTEMPTS: u32 = 3;

impl LaunchTracker {
    /// 저장소에서 전체 다시 읽기
    pub async fn reload(&self) -> LaunchResult<()> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.load_snapshot().await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn load_snapshot(&self) -> LaunchResult<()> {
        let mut attempt = 1;
        loop {
            // 목록 조회는 잠금 없이. 그동안 반영된 로컬 쓰기가 있으면 스냅샷을 다시 읽음
            let landed = self.landed.load(Ordering::SeqCst);
            let (records, projects) = self.read_snapshot().await?;

            let outbox = self.outbox.lock().await;
            let mut board = self.board.write().await;
            if self.landed.load(Ordering::SeqCst) != landed && attempt < SNAPSHOT_ATTEMPTS {
                tracing::debug!("[Tracker] local writes landed during reload, reading again");
                attempt += 1;
                continue;
            }

            board.replace_records(records);
            board.replace_projects(projects);
            for write in outbox.pending() {
                board.overlay_pending(&write.op);
            }
            tracing::debug!(
                "[Tracker] reloaded {} cells, {} launch projects ({} pending writes)",
                board.len(),
                board.projects().len(),
                outbox.len()
            );
            return Ok(());
        }
    }

    async fn read_snapshot(&self) -> LaunchResult<(Vec<LaunchStatusRecord>, Vec<LaunchProject>)> {
        let status_docs = self.store.list(Collection::LaunchStatuses).await?;
        let project_docs = self.store.list(Collection::LaunchProjects).await?;

        let records = status_docs
            .iter()
            .filter_map(|doc| match doc.decode() {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("[Tracker] skipping undecodable status {}: {}", doc.id, e);
                    None
                }
            })
            .collect();
        let projects = project_docs
            .into_iter()
            .filter_map(|doc| match doc.decode::<LaunchProject>() {
                Ok(mut project) => {
                    project.id = doc.id;
                    Some(project)
                }
                Err(e) => {
                    tracing::warn!("[Tracker] skipping undecodable launch project {}: {}", doc.id, e);
                    None
                }
            })
            .collect();
        Ok((records, projects))
    }

    async fn reload_logged(&self) {
        if let Err(e) = self.reload().await {
            // 이전 상태를 그대로 보여줌
            tracing::warn!("[Tracker] reload failed, keeping stale data: {}", e);
        }
    }

    /// 변경 알림 구독 시작. 반환된 핸들을 drop하면 구독 해제
    pub fn watch(self: &Arc<Self>) -> BackgroundTask {
        let mut rx = self.store.subscribe();
        let tracker = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        if !matches!(
                            change.collection,
                            Collection::LaunchStatuses | Collection::LaunchProjects
                        ) {
                            continue;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("[Tracker] change feed lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }

                // 연달아 온 알림은 한 번의 reload로 처리
                loop {
                    match rx.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                    }
                }
                tracker.reload_logged().await;
            }
            tracing::info!("[Tracker] change feed closed");
        });

        BackgroundTask::new("launch-watch", handle)
    }

    /// 주기적으로 outbox 재시도
    pub fn spawn_flusher(self: &Arc<Self>, interval: Duration) -> BackgroundTask {
        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 첫 tick은 즉시 발생
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracker.flush().await;
            }
        });
        BackgroundTask::new("outbox-flusher", handle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::{tracker, LIVE};
    use super::*;
    use crate::catalog::PlatformCatalog;
    use crate::keys::canonical_key;
    use crate::models::{LaunchStatus, CellState};
    use crate::store::testing::FlakyStore;
    use crate::store::{to_fields, DocumentStore, MemoryStore};

    fn record(platform: &str, status: LaunchStatus) -> LaunchStatusRecord {
        LaunchStatusRecord {
            key: canonical_key("proj1", LIVE, platform),
            project_id: "proj1".to_string(),
            platform_id: platform.to_string(),
            category: Some(LIVE.to_string()),
            status,
            note: String::new(),
            timestamp: 1,
        }
    }

    async fn wait_for<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn test_remote_changes_replace_local_state() {
        let (store, tracker) = tracker();
        let _watch = tracker.watch();

        // 다른 클라이언트가 쓴 것처럼 저장소에 직접 기록
        store
            .create(Collection::LaunchStatuses, to_fields(&record("lezhin", LaunchStatus::Pending)).unwrap())
            .await
            .unwrap();

        let t = tracker.clone();
        wait_for(move || {
            let t = t.clone();
            async move {
                t.effective_cell("proj1", LIVE, "lezhin").await.unwrap().status == LaunchStatus::Pending
            }
        })
        .await;
    }

    #[tokio::test]
    async fn test_dropping_handle_detaches() {
        let (store, tracker) = tracker();
        let watch = tracker.watch();
        watch.detach();
        tokio::task::yield_now().await;

        store
            .create(Collection::LaunchStatuses, to_fields(&record("ridi", LaunchStatus::Launched)).unwrap())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "ridi").await.unwrap(),
            CellState::default()
        );
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_stale_board() {
        let memory = Arc::new(MemoryStore::new());
        memory
            .create(Collection::LaunchStatuses, to_fields(&record("lezhin", LaunchStatus::Launched)).unwrap())
            .await
            .unwrap();
        let flaky = Arc::new(FlakyStore::new(memory.clone()));
        let tracker = LaunchTracker::new(flaky.clone(), PlatformCatalog::default(), 3);
        tracker.reload().await.unwrap();

        flaky.fail_reads(true);
        assert!(tracker.reload().await.is_err());
        assert!(!tracker.is_loading());
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "lezhin").await.unwrap().status,
            LaunchStatus::Launched
        );
    }

    #[tokio::test]
    async fn test_pending_writes_survive_reload() {
        let memory = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::new(memory.clone()));
        let tracker = LaunchTracker::new(flaky.clone(), PlatformCatalog::default(), 3);

        flaky.fail_writes(true);
        tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        tracker.reload().await.unwrap();
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "lezhin").await.unwrap().status,
            LaunchStatus::Launched
        );
        assert_eq!(memory.count(Collection::LaunchStatuses).await, 0);
    }
}
