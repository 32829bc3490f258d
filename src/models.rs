//! Launch Board Data Models
//!
//! 프론트엔드 타입과 매핑되는 Rust 데이터 모델

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LaunchError;

/// 작품(프로젝트) 라이프사이클 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Production,
    Scheduled,
    Live,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Production => "production",
            ProjectStatus::Scheduled => "scheduled",
            ProjectStatus::Live => "live",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ProjectStatus::Completed)
    }

    /// 런칭 카테고리에서 사용하는 단계
    pub fn phase(&self) -> Phase {
        if self.is_completed() {
            Phase::Completed
        } else {
            Phase::Live
        }
    }
}

/// 작품 (메인 프로젝트 관리 기능 소유, 런칭 트래커는 id/status만 참조)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// 국내/해외 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Domestic,
    Overseas,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::Domestic => "국내비독점",
            Region::Overseas => "해외비독점",
        }
    }
}

/// 라이브/완결 구분 (LaunchProject.status 값이기도 함)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Live,
    Completed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Live => "라이브",
            Phase::Completed => "완결",
        }
    }
}

/// 런칭 카테고리: {국내, 해외} × {라이브, 완결}
///
/// 저장 형식은 `국내비독점 [라이브]` 같은 한글 라벨입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LaunchCategory {
    pub region: Region,
    pub phase: Phase,
}

impl LaunchCategory {
    pub const ALL: [LaunchCategory; 4] = [
        LaunchCategory::new(Region::Domestic, Phase::Live),
        LaunchCategory::new(Region::Overseas, Phase::Live),
        LaunchCategory::new(Region::Domestic, Phase::Completed),
        LaunchCategory::new(Region::Overseas, Phase::Completed),
    ];

    pub const fn new(region: Region, phase: Phase) -> Self {
        Self { region, phase }
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.region.label(), self.phase.label())
    }

    /// 라벨 파싱 (앞뒤 공백 무시)
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// 지역은 유지하고 라이브/완결만 교체
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self::new(self.region, phase)
    }
}

impl fmt::Display for LaunchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl TryFrom<String> for LaunchCategory {
    type Error = LaunchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LaunchCategory::parse(&value)
            .ok_or_else(|| LaunchError::validation(format!("Unknown launch category: {}", value)))
    }
}

impl From<LaunchCategory> for String {
    fn from(value: LaunchCategory) -> Self {
        value.label()
    }
}

/// 임의의 카테고리 문자열을 목표 단계로 재작성
///
/// 알려진 라벨이면 지역을 유지한 채 단계만 바꾸고, 그 외에는 `라이브`/`완결`
/// 접미사를 치환합니다. 치환할 부분이 없으면 `None`.
pub fn rewrite_category_label(label: &str, phase: Phase) -> Option<String> {
    if let Some(category) = LaunchCategory::parse(label) {
        return Some(category.with_phase(phase).label());
    }

    let (from, to) = match phase {
        Phase::Completed => (Phase::Live.label(), Phase::Completed.label()),
        Phase::Live => (Phase::Completed.label(), Phase::Live.label()),
    };
    let trimmed = label.trim();
    if trimmed.contains(from) {
        Some(trimmed.replace(from, to))
    } else if trimmed.contains(to) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// 런칭 트래킹 대상 작품 (작품 × 카테고리당 1행)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchProject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub category: LaunchCategory,
    pub status: Phase,
    pub project_id: String,
}

/// 플랫폼별 런칭 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchStatus {
    #[default]
    None,
    Launched,
    Pending,
    Rejected,
}

impl LaunchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchStatus::None => "none",
            LaunchStatus::Launched => "launched",
            LaunchStatus::Pending => "pending",
            LaunchStatus::Rejected => "rejected",
        }
    }

    /// 좌클릭: launched ↔ none
    pub fn toggled(self) -> Self {
        match self {
            LaunchStatus::Launched => LaunchStatus::None,
            _ => LaunchStatus::Launched,
        }
    }

    /// 우클릭: none → pending → rejected → none, launched는 pending으로
    pub fn cycled(self) -> Self {
        match self {
            LaunchStatus::None => LaunchStatus::Pending,
            LaunchStatus::Pending => LaunchStatus::Rejected,
            LaunchStatus::Rejected => LaunchStatus::None,
            LaunchStatus::Launched => LaunchStatus::Pending,
        }
    }
}

impl fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 셀 하나의 유효 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    pub status: LaunchStatus,
    pub note: String,
}

impl CellState {
    pub fn new(status: LaunchStatus, note: impl Into<String>) -> Self {
        Self { status, note: note.into() }
    }

    /// none + 빈 메모는 저장하지 않음
    pub fn is_default(&self) -> bool {
        self.status == LaunchStatus::None && self.note.trim().is_empty()
    }
}

/// `launchStatuses` 컬렉션 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchStatusRecord {
    pub key: String,
    pub project_id: String,
    pub platform_id: String,
    /// 레거시 레코드에는 없음
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: LaunchStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub note: String,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub timestamp: i64,
}

impl LaunchStatusRecord {
    pub fn cell(&self) -> CellState {
        CellState::new(self.status, self.note.clone())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// epoch millis 정수 또는 RFC3339 문자열(서버 타임스탬프) 모두 허용
fn lenient_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default()),
        serde_json::Value::String(s) => {
            if let Ok(millis) = s.parse::<i64>() {
                return Ok(millis);
            }
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.timestamp_millis())
                .map_err(serde::de::Error::custom)
        }
        serde_json::Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("invalid timestamp: {}", other))),
    }
}
