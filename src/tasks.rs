//! Background Tasks
//!
//! 백그라운드 작업 핸들. 핸들을 drop하면 작업이 중단됩니다 (화면 언마운트 시 구독 해제).

use tokio::task::JoinHandle;

pub struct BackgroundTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 명시적 중단
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        tracing::debug!("[Task] {} detached", self.name);
        self.handle.abort();
    }
}
