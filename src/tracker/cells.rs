//! 셀 상태 전이 및 저장
//!
//! - 좌클릭: launched ↔ none
//! - 우클릭: none → pending → rejected → none (launched → pending)
//!
//! 로컬 상태 변경과 outbox 예약은 outbox → board 순서로 잠근 채 함께 처리하고,
//! 잠금을 푼 뒤 flush를 시도합니다. 이미 flush가 진행 중이면 기다리지 않습니다.
//! 저장 실패는 로컬 상태를 되돌리지 않습니다.

use serde::Serialize;

use super::{cell_key, record_for, LaunchTracker};
use crate::error::LaunchResult;
use crate::keys::CellKey;
use crate::models::{CellState, LaunchStatus};
use crate::outbox::{FlushReport, Outbox, OutboxOp};

/// 일괄 저장 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub upserted: usize,
    pub skipped: usize,
    pub flush: FlushReport,
}

impl LaunchTracker {
    /// 좌클릭
    pub async fn toggle_launch(&self, project_id: &str, category: &str, platform_id: &str) -> LaunchResult<CellState> {
        self.transition(project_id, category, platform_id, LaunchStatus::toggled).await
    }

    /// 우클릭
    pub async fn cycle_review(&self, project_id: &str, category: &str, platform_id: &str) -> LaunchResult<CellState> {
        self.transition(project_id, category, platform_id, LaunchStatus::cycled).await
    }

    async fn transition(
        &self,
        project_id: &str,
        category: &str,
        platform_id: &str,
        next: fn(LaunchStatus) -> LaunchStatus,
    ) -> LaunchResult<CellState> {
        let key = cell_key(project_id, category, platform_id)?;
        let state = {
            let mut outbox = self.outbox.lock().await;
            let mut board = self.board.write().await;
            let current = board.effective(&key);
            let status = next(current.status);
            // none으로 돌아가면 메모까지 포함해 레코드를 지움
            let state = if status == LaunchStatus::None {
                CellState::default()
            } else {
                CellState::new(status, current.note)
            };
            board.set(&key, state.clone());
            enqueue_cell(&mut outbox, &key, &state);
            state
        };

        tracing::debug!("[Tracker] {} -> {}", key, state.status);
        self.write_through().await;
        Ok(state)
    }

    /// 메모 수정 (현재 유효 상태 유지)
    pub async fn update_note(
        &self,
        project_id: &str,
        category: &str,
        platform_id: &str,
        note: &str,
    ) -> LaunchResult<CellState> {
        let key = cell_key(project_id, category, platform_id)?;
        let state = {
            let mut outbox = self.outbox.lock().await;
            let mut board = self.board.write().await;
            let current = board.effective(&key);
            let state = CellState::new(current.status, note);
            board.set(&key, state.clone());
            enqueue_cell(&mut outbox, &key, &state);
            state
        };

        self.write_through().await;
        Ok(state)
    }

    /// 저장소 반영 없이 로컬에만 기록 (나중에 `save_all`로 저장)
    ///
    /// 저장 전에 원격 변경으로 reload되면 스냅샷으로 덮어씁니다.
    pub async fn stage(&self, key: CellKey, state: CellState) {
        self.stage_with(key, |_| state).await;
    }

    /// 상태만 로컬에 기록 (메모 유지)
    pub async fn stage_status(
        &self,
        project_id: &str,
        category: &str,
        platform_id: &str,
        status: LaunchStatus,
    ) -> LaunchResult<CellState> {
        let key = cell_key(project_id, category, platform_id)?;
        Ok(self.stage_with(key, |current| CellState::new(status, current.note)).await)
    }

    /// 메모만 로컬에 기록
    pub async fn stage_note(
        &self,
        project_id: &str,
        category: &str,
        platform_id: &str,
        note: &str,
    ) -> LaunchResult<CellState> {
        let key = cell_key(project_id, category, platform_id)?;
        Ok(self
            .stage_with(key, |current| CellState::new(current.status, note))
            .await)
    }

    async fn stage_with(&self, key: CellKey, edit: impl FnOnce(CellState) -> CellState) -> CellState {
        let _outbox = self.outbox.lock().await;
        let mut board = self.board.write().await;
        let state = edit(board.effective(&key));
        if state.is_default() {
            board.remove(&key);
        } else {
            board.insert(key, state.clone());
        }
        state
    }

    /// 일괄 저장: 로컬 셀 중 기본값이 아닌 것을 모두 upsert
    pub async fn save_all(&self) -> SaveSummary {
        let (records, skipped) = {
            let board = self.board.read().await;
            let mut records = Vec::new();
            let mut skipped = 0;
            for (key, state) in board.entries() {
                if state.is_default() {
                    skipped += 1;
                } else {
                    records.push(record_for(key, state));
                }
            }
            (records, skipped)
        };

        let upserted = records.len();
        {
            let mut outbox = self.outbox.lock().await;
            for record in records {
                outbox.enqueue(OutboxOp::UpsertStatus { record });
            }
        }
        let flush = self.flush().await;
        tracing::info!("[Tracker] save all: {} upserted, {} skipped", upserted, skipped);

        SaveSummary {
            upserted,
            skipped,
            flush,
        }
    }
}

/// 셀 쓰기 예약
///
/// none + 빈 메모면 정규 키 레코드 삭제, 아니면 upsert.
/// 상태가 none이면 같은 셀의 레거시 레코드도 삭제합니다.
fn enqueue_cell(outbox: &mut Outbox, key: &CellKey, state: &CellState) {
    if state.is_default() {
        outbox.enqueue(OutboxOp::DeleteStatus { key: key.to_string() });
    } else {
        outbox.enqueue(OutboxOp::UpsertStatus {
            record: record_for(key, state),
        });
    }
    if state.status == LaunchStatus::None && !key.is_legacy() {
        outbox.enqueue(OutboxOp::DeleteStatus {
            key: key.to_legacy().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::super::testing::{tracker, LIVE};
    use super::*;
    use crate::catalog::PlatformCatalog;
    use crate::keys::{canonical_key, legacy_key};
    use crate::models::LaunchStatusRecord;
    use crate::store::testing::FlakyStore;
    use crate::store::{to_fields, Collection, DocumentStore, MemoryStore};

    async fn stored(store: &MemoryStore, key: &str) -> Vec<LaunchStatusRecord> {
        store
            .find_by(Collection::LaunchStatuses, "key", &json!(key))
            .await
            .unwrap()
            .iter()
            .map(|d| d.decode().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_click_scenario() {
        let (store, tracker) = tracker();
        let key = canonical_key("proj1", LIVE, "lezhin");

        let s = tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::Launched);
        assert_eq!(stored(&store, &key).await[0].status, LaunchStatus::Launched);

        let s = tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::None);
        assert!(stored(&store, &key).await.is_empty());

        let s = tracker.cycle_review("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::Pending);
        let s = tracker.cycle_review("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::Rejected);
        assert_eq!(stored(&store, &key).await[0].status, LaunchStatus::Rejected);
        let s = tracker.cycle_review("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::None);

        assert!(stored(&store, &key).await.is_empty());
        assert_eq!(store.count(Collection::LaunchStatuses).await, 0);
    }

    #[tokio::test]
    async fn test_secondary_from_launched_jumps_to_pending() {
        let (_, tracker) = tracker();
        tracker.toggle_launch("proj1", LIVE, "ridi").await.unwrap();
        let s = tracker.cycle_review("proj1", LIVE, "ridi").await.unwrap();
        assert_eq!(s.status, LaunchStatus::Pending);
    }

    #[tokio::test]
    async fn test_none_deletes_canonical_and_legacy_records() {
        let (store, tracker) = tracker();
        let legacy = LaunchStatusRecord {
            key: legacy_key("proj1", "lezhin"),
            project_id: "proj1".to_string(),
            platform_id: "lezhin".to_string(),
            category: None,
            status: LaunchStatus::Launched,
            note: String::new(),
            timestamp: 1,
        };
        store
            .create(Collection::LaunchStatuses, to_fields(&legacy).unwrap())
            .await
            .unwrap();
        tracker.reload().await.unwrap();

        // 레거시 launched가 유효 상태 → 좌클릭하면 none
        let s = tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::None);
        assert!(stored(&store, &legacy_key("proj1", "lezhin")).await.is_empty());
        assert!(stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await.is_empty());
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "lezhin").await.unwrap(),
            CellState::default()
        );
    }

    #[tokio::test]
    async fn test_transition_to_none_drops_note_record() {
        let (store, tracker) = tracker();
        tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        tracker.update_note("proj1", LIVE, "lezhin", " 3월 오픈 ").await.unwrap();
        let records = stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await;
        assert_eq!(records[0].note, " 3월 오픈 ");

        let s = tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s, CellState::default());
        assert!(stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await.is_empty());
    }

    #[tokio::test]
    async fn test_note_on_untouched_cell_creates_none_record() {
        let (store, tracker) = tracker();
        let s = tracker.update_note("proj1", LIVE, "ridi", "계약 대기").await.unwrap();
        assert_eq!(s, CellState::new(LaunchStatus::None, "계약 대기"));

        let records = stored(&store, &canonical_key("proj1", LIVE, "ridi")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, LaunchStatus::None);

        // 메모도 비우면 삭제
        tracker.update_note("proj1", LIVE, "ridi", "").await.unwrap();
        assert!(stored(&store, &canonical_key("proj1", LIVE, "ridi")).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_local_state() {
        let memory = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyStore::new(memory.clone()));
        let tracker = LaunchTracker::new(flaky.clone(), PlatformCatalog::default(), 5);

        flaky.fail_writes(true);
        let s = tracker.toggle_launch("proj1", LIVE, "lezhin").await.unwrap();
        assert_eq!(s.status, LaunchStatus::Launched);
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "lezhin").await.unwrap().status,
            LaunchStatus::Launched
        );
        assert_eq!(memory.count(Collection::LaunchStatuses).await, 0);
        assert_eq!(tracker.pending_writes().await.len(), 1);

        flaky.fail_writes(false);
        assert!(tracker.flush().await.is_clean());
        assert_eq!(memory.count(Collection::LaunchStatuses).await, 1);
    }

    #[tokio::test]
    async fn test_save_all_scenario() {
        let (store, tracker) = tracker();
        tracker
            .stage(CellKey::parse("p1::cat::plat").unwrap(), CellState::new(LaunchStatus::Launched, ""))
            .await;
        assert_eq!(store.count(Collection::LaunchStatuses).await, 0);

        let summary = tracker.save_all().await;
        assert_eq!(summary.upserted, 1);
        assert!(summary.flush.is_clean());

        let records = stored(&store, "p1::cat::plat").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, LaunchStatus::Launched);
        assert_eq!(records[0].note, "");
        assert_eq!(records[0].project_id, "p1");
        assert_eq!(records[0].category.as_deref(), Some("cat"));
        assert_eq!(records[0].platform_id, "plat");

        // 다시 저장해도 레코드는 하나
        tracker.save_all().await;
        assert_eq!(store.count(Collection::LaunchStatuses).await, 1);
    }

    #[tokio::test]
    async fn test_save_all_note_only_and_legacy_keys() {
        let (store, tracker) = tracker();
        tracker
            .stage(CellKey::parse("p1-line-manga").unwrap(), CellState::new(LaunchStatus::None, "계약 검토"))
            .await;
        tracker
            .stage(CellKey::parse("p1::cat::ridi").unwrap(), CellState::default())
            .await;

        let summary = tracker.save_all().await;
        assert_eq!(summary.upserted, 1);

        let records = stored(&store, "p1-line-manga").await;
        assert_eq!(records[0].platform_id, "line-manga");
        assert_eq!(records[0].category, None);
        assert_eq!(records[0].note, "계약 검토");
    }

    #[tokio::test]
    async fn test_staged_edits_wait_for_save_all() {
        let (store, tracker) = tracker();
        tracker.stage_note("proj1", LIVE, "lezhin", " 4월 오픈 ").await.unwrap();
        let s = tracker
            .stage_status("proj1", LIVE, "lezhin", LaunchStatus::Pending)
            .await
            .unwrap();
        assert_eq!(s, CellState::new(LaunchStatus::Pending, " 4월 오픈 "));
        assert_eq!(store.count(Collection::LaunchStatuses).await, 0);

        tracker.save_all().await;
        let records = stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await;
        assert_eq!(records[0].note, " 4월 오픈 ");
    }

    #[tokio::test]
    async fn test_note_is_stored_verbatim() {
        let (store, tracker) = tracker();
        let note = "  1화 선공개\n  2화부터 유료  ";
        let s = tracker.update_note("proj1", LIVE, "lezhin", note).await.unwrap();
        assert_eq!(s.note, note);
        assert_eq!(stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await[0].note, note);

        // 공백뿐인 메모는 빈 메모로 보고 레코드를 지움
        tracker.update_note("proj1", LIVE, "lezhin", "   ").await.unwrap();
        assert!(stored(&store, &canonical_key("proj1", LIVE, "lezhin")).await.is_empty());
    }

    #[tokio::test]
    async fn test_clicks_do_not_wait_for_slow_writes() {
        let memory = Arc::new(MemoryStore::new());
        let slow = Arc::new(FlakyStore::new(memory.clone()));
        slow.delay_writes(Duration::from_secs(5));
        let tracker = Arc::new(LaunchTracker::new(slow.clone(), PlatformCatalog::default(), 3));

        let first = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.toggle_launch("proj1", LIVE, "lezhin").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = tokio::time::timeout(
            Duration::from_secs(1),
            tracker.toggle_launch("proj1", LIVE, "ridi"),
        )
        .await
        .expect("second click blocked by the slow write")
        .unwrap();
        assert_eq!(second.status, LaunchStatus::Launched);
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "ridi").await.unwrap().status,
            LaunchStatus::Launched
        );

        // 반영 중인 쓰기도 대기 목록에 보이고, reload가 막히지 않음
        let pending = tokio::time::timeout(Duration::from_secs(1), tracker.pending_writes())
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        tokio::time::timeout(Duration::from_secs(1), tracker.reload())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            tracker.effective_cell("proj1", LIVE, "lezhin").await.unwrap().status,
            LaunchStatus::Launched
        );
        first.abort();
    }
}
