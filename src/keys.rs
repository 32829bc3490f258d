//! Launch Status Keys
//!
//! 런칭 상태 레코드 키 생성/파싱
//!
//! - 정규 키: `projectId::category::platformId`
//! - 레거시 키: `projectId-platformId` (카테고리 도입 이전 데이터)
//!
//! 레거시 키는 첫 번째 `-` 기준으로 나눕니다. 플랫폼 ID에는 `-`가 들어갈 수
//! 있지만 프로젝트 ID에는 없다고 가정합니다.

use std::fmt;
use std::str::FromStr;

use crate::error::LaunchError;

pub const CANONICAL_SEPARATOR: &str = "::";
pub const LEGACY_SEPARATOR: char = '-';

/// 정규 키 생성 (카테고리는 trim)
pub fn canonical_key(project_id: &str, category: &str, platform_id: &str) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        project_id,
        category.trim(),
        platform_id,
        sep = CANONICAL_SEPARATOR
    )
}

/// 레거시 키 생성
pub fn legacy_key(project_id: &str, platform_id: &str) -> String {
    format!("{}{}{}", project_id, LEGACY_SEPARATOR, platform_id)
}

/// 셀 식별자
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey {
    Canonical {
        project_id: String,
        category: String,
        platform_id: String,
    },
    Legacy {
        project_id: String,
        platform_id: String,
    },
}

impl CellKey {
    pub fn canonical(project_id: &str, category: &str, platform_id: &str) -> Self {
        CellKey::Canonical {
            project_id: project_id.to_string(),
            category: category.trim().to_string(),
            platform_id: platform_id.to_string(),
        }
    }

    pub fn legacy(project_id: &str, platform_id: &str) -> Self {
        CellKey::Legacy {
            project_id: project_id.to_string(),
            platform_id: platform_id.to_string(),
        }
    }

    /// 저장된 키 문자열을 역파싱
    ///
    /// `::`로 나눠 정확히 세 부분이면 정규 키, 아니면 첫 `-`에서 나눈 레거시 키.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(CANONICAL_SEPARATOR).collect();
        if parts.len() == 3 {
            if parts[0].is_empty() || parts[2].is_empty() {
                return None;
            }
            return Some(CellKey::canonical(parts[0], parts[1], parts[2]));
        }

        let (project_id, platform_id) = raw.split_once(LEGACY_SEPARATOR)?;
        if project_id.is_empty() || platform_id.is_empty() {
            return None;
        }
        Some(CellKey::legacy(project_id, platform_id))
    }

    /// 레코드 필드로부터 키 복원 (키 문자열이 깨진 경우의 보조 경로)
    pub fn from_fields(project_id: &str, category: Option<&str>, platform_id: &str) -> Option<Self> {
        if project_id.is_empty() || platform_id.is_empty() {
            return None;
        }
        Some(match category {
            Some(category) if !category.trim().is_empty() => {
                CellKey::canonical(project_id, category, platform_id)
            }
            _ => CellKey::legacy(project_id, platform_id),
        })
    }

    pub fn project_id(&self) -> &str {
        match self {
            CellKey::Canonical { project_id, .. } | CellKey::Legacy { project_id, .. } => project_id,
        }
    }

    pub fn platform_id(&self) -> &str {
        match self {
            CellKey::Canonical { platform_id, .. } | CellKey::Legacy { platform_id, .. } => platform_id,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            CellKey::Canonical { category, .. } => Some(category),
            CellKey::Legacy { .. } => None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, CellKey::Legacy { .. })
    }

    /// 같은 셀의 레거시 키
    pub fn to_legacy(&self) -> CellKey {
        CellKey::legacy(self.project_id(), self.platform_id())
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKey::Canonical {
                project_id,
                category,
                platform_id,
            } => f.write_str(&canonical_key(project_id, category, platform_id)),
            CellKey::Legacy {
                project_id,
                platform_id,
            } => f.write_str(&legacy_key(project_id, platform_id)),
        }
    }
}

impl FromStr for CellKey {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellKey::parse(s).ok_or_else(|| LaunchError::InvalidKey(s.to_string()))
    }
}
