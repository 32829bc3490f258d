//! Write Outbox
//!
//! 로컬 상태는 즉시 바꾸고, 저장소 쓰기는 이 큐에 쌓은 뒤 flush합니다.
//! 같은 대상(런칭 상태 키 / 런칭 작품 ID)에 대한 쓰기는 마지막 것만 남깁니다.
//! 실패한 쓰기는 큐에 남아 재시도되고, 최대 시도 횟수를 넘으면 dead letter로 옮겨집니다.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::LaunchResult;
use crate::models::{LaunchCategory, LaunchStatusRecord, Phase};
use crate::store::{to_fields, Collection, DocumentStore, Fields};

/// 쓰기 대상
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum WriteTarget {
    StatusKey(String),
    LaunchProject(String),
}

/// 대기 중인 쓰기 연산
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboxOp {
    /// 키로 조회 후 생성 또는 갱신
    UpsertStatus { record: LaunchStatusRecord },
    /// 해당 키의 레코드 모두 삭제
    DeleteStatus { key: String },
    /// 런칭 작품 행 제자리 갱신
    #[serde(rename_all = "camelCase")]
    UpdateLaunchProject {
        id: String,
        category: LaunchCategory,
        status: Phase,
    },
}

impl OutboxOp {
    pub fn target(&self) -> WriteTarget {
        match self {
            OutboxOp::UpsertStatus { record } => WriteTarget::StatusKey(record.key.clone()),
            OutboxOp::DeleteStatus { key } => WriteTarget::StatusKey(key.clone()),
            OutboxOp::UpdateLaunchProject { id, .. } => WriteTarget::LaunchProject(id.clone()),
        }
    }

    /// 저장소에 반영
    pub async fn apply(&self, store: &dyn DocumentStore) -> LaunchResult<()> {
        match self {
            OutboxOp::UpsertStatus { record } => {
                let fields = to_fields(record)?;
                let existing = store
                    .find_by(Collection::LaunchStatuses, "key", &json!(record.key))
                    .await?;
                match existing.split_first() {
                    Some((first, duplicates)) => {
                        store.update(Collection::LaunchStatuses, &first.id, fields).await?;
                        // 같은 키의 중복 레코드는 하나로 수렴
                        for dup in duplicates {
                            store.delete(Collection::LaunchStatuses, &dup.id).await?;
                        }
                    }
                    None => {
                        store.create(Collection::LaunchStatuses, fields).await?;
                    }
                }
                Ok(())
            }
            OutboxOp::DeleteStatus { key } => {
                let existing = store.find_by(Collection::LaunchStatuses, "key", &json!(key)).await?;
                for doc in existing {
                    store.delete(Collection::LaunchStatuses, &doc.id).await?;
                }
                Ok(())
            }
            OutboxOp::UpdateLaunchProject { id, category, status } => {
                let mut fields = Fields::new();
                fields.insert("category".to_string(), Value::String(category.label()));
                fields.insert("status".to_string(), serde_json::to_value(status)?);
                store.update(Collection::LaunchProjects, id, fields).await
            }
        }
    }
}

/// 대기 중인 쓰기
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    pub op: OutboxOp,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub enqueued_at: i64,
}

/// flush 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub applied: usize,
    pub retained: usize,
    pub dead_lettered: usize,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.retained == 0 && self.dead_lettered == 0
    }
}

pub struct Outbox {
    queue: VecDeque<PendingWrite>,
    /// 저장소에 반영 중인 묶음 (잠금 밖에서 처리 중)
    in_flight: Vec<PendingWrite>,
    dead_letters: Vec<PendingWrite>,
    max_attempts: u32,
}

impl Outbox {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: Vec::new(),
            dead_letters: Vec::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// 쓰기 추가 (같은 대상의 이전 쓰기는 대체)
    pub fn enqueue(&mut self, op: OutboxOp) {
        let target = op.target();
        self.queue.retain(|w| w.op.target() != target);
        self.queue.push_back(PendingWrite {
            op,
            attempts: 0,
            last_error: None,
            enqueued_at: chrono::Utc::now().timestamp_millis(),
        });
    }

    /// 아직 저장소에 반영되지 않은 쓰기 수 (반영 중인 것 포함)
    pub fn len(&self) -> usize {
        self.in_flight.len() + self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 반영 중인 쓰기 → 대기 중인 쓰기 순서. 같은 대상이면 뒤의 것이 최신
    pub fn pending(&self) -> impl Iterator<Item = &PendingWrite> {
        self.in_flight.iter().chain(self.queue.iter())
    }

    /// 한 번도 시도하지 않은 쓰기가 있는지
    pub fn has_fresh(&self) -> bool {
        self.queue.iter().any(|w| w.attempts == 0)
    }

    pub fn dead_letters(&self) -> &[PendingWrite] {
        &self.dead_letters
    }

    /// dead letter를 다시 큐에 넣음 (수동 재조정용)
    pub fn requeue_dead_letters(&mut self) -> usize {
        let letters = std::mem::take(&mut self.dead_letters);
        let count = letters.len();
        for mut write in letters {
            let target = write.op.target();
            if self.pending().any(|w| w.op.target() == target) {
                // 더 최신 쓰기가 이미 대기 중
                continue;
            }
            write.attempts = 0;
            self.queue.push_back(write);
        }
        count
    }

    /// 대기 중인 쓰기를 모두 꺼냄. 반영은 outbox 잠금 밖에서 `FlushBatch::apply`로
    pub fn take_batch(&mut self) -> FlushBatch {
        let writes: Vec<PendingWrite> = self.queue.drain(..).collect();
        self.in_flight = writes.clone();
        FlushBatch {
            writes,
            max_attempts: self.max_attempts,
        }
    }

    /// 반영 결과 병합
    ///
    /// 실패한 쓰기는 큐 앞쪽으로 돌아갑니다. 반영하는 동안 같은 대상에
    /// 새 쓰기가 들어왔으면 실패한 쓰기는 버립니다.
    pub fn complete(&mut self, outcome: FlushOutcome) -> FlushReport {
        self.in_flight.clear();
        let mut report = FlushReport {
            applied: outcome.applied,
            ..FlushReport::default()
        };

        let mut requeued = VecDeque::new();
        for write in outcome.failed {
            let target = write.op.target();
            if self.queue.iter().any(|w| w.op.target() == target) {
                tracing::debug!("[Outbox] failed write to {:?} superseded by a newer one", target);
                continue;
            }
            if write.attempts >= self.max_attempts {
                tracing::error!(
                    "[Outbox] giving up on {:?} after {} attempts: {}",
                    target,
                    write.attempts,
                    write.last_error.as_deref().unwrap_or("unknown error")
                );
                report.dead_lettered += 1;
                self.dead_letters.push(write);
            } else {
                report.retained += 1;
                requeued.push_back(write);
            }
        }

        requeued.extend(self.queue.drain(..));
        self.queue = requeued;
        report
    }
}

/// outbox에서 꺼낸 쓰기 묶음
pub struct FlushBatch {
    writes: Vec<PendingWrite>,
    max_attempts: u32,
}

/// 묶음 반영 결과 (`Outbox::complete`로 되돌림)
pub struct FlushOutcome {
    applied: usize,
    failed: Vec<PendingWrite>,
}

impl FlushBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// 순서대로 저장소에 반영
    pub async fn apply(self, store: &dyn DocumentStore) -> FlushOutcome {
        let mut outcome = FlushOutcome {
            applied: 0,
            failed: Vec::new(),
        };

        for mut write in self.writes {
            match write.op.apply(store).await {
                Ok(()) => {
                    tracing::debug!("[Outbox] applied {:?}", write.op.target());
                    outcome.applied += 1;
                }
                Err(e) => {
                    write.attempts += 1;
                    write.last_error = Some(e.to_string());
                    if write.attempts < self.max_attempts {
                        tracing::warn!(
                            "[Outbox] write to {:?} failed (attempt {}): {}",
                            write.op.target(),
                            write.attempts,
                            e
                        );
                    }
                    outcome.failed.push(write);
                }
            }
        }

        outcome
    }
}
