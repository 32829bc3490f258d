//! Launch Board Configuration
//!
//! 환경 변수(.env.local / .env) 기반 설정

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LaunchError, LaunchResult};

const DEFAULT_DB_PATH: &str = "launch-board.db";
const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
const DEFAULT_OUTBOX_MAX_ATTEMPTS: u32 = 5;

/// 저장소 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Firestore,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "sqlite" => Some(StoreBackend::Sqlite),
            "firestore" => Some(StoreBackend::Firestore),
            _ => None,
        }
    }
}

/// Firestore 연결 설정
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub api_key: Option<String>,
    /// 에뮬레이터 등 기본 엔드포인트 대체
    pub endpoint: Option<String>,
}

impl FirestoreConfig {
    pub fn documents_url(&self) -> String {
        let endpoint = self
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_FIRESTORE_ENDPOINT)
            .trim_end_matches('/');
        format!(
            "{}/projects/{}/databases/{}/documents",
            endpoint, self.project_id, self.database
        )
    }
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub db_path: PathBuf,
    pub firestore: Option<FirestoreConfig>,
    pub poll_interval: Duration,
    pub flush_interval: Duration,
    pub outbox_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            firestore: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            outbox_max_attempts: DEFAULT_OUTBOX_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// 테스트/개발용 메모리 저장소 설정
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// .env 파일을 읽은 뒤 환경 변수에서 설정 구성
    pub fn load() -> LaunchResult<Self> {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 구성 (빈 값은 미설정으로 취급)
    pub fn from_lookup<F>(lookup: F) -> LaunchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("LAUNCH_STORE_BACKEND") {
            config.backend = StoreBackend::parse(&raw)
                .ok_or_else(|| LaunchError::Config(format!("Unknown LAUNCH_STORE_BACKEND: {}", raw)))?;
        }
        if let Some(path) = get("LAUNCH_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(ms) = get("LAUNCH_POLL_INTERVAL_MS") {
            config.poll_interval = parse_interval("LAUNCH_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = get("LAUNCH_FLUSH_INTERVAL_MS") {
            config.flush_interval = parse_interval("LAUNCH_FLUSH_INTERVAL_MS", &ms)?;
        }
        if let Some(n) = get("LAUNCH_OUTBOX_MAX_ATTEMPTS") {
            let attempts = parse_number("LAUNCH_OUTBOX_MAX_ATTEMPTS", &n)?;
            if attempts == 0 {
                return Err(LaunchError::Config("LAUNCH_OUTBOX_MAX_ATTEMPTS must be at least 1".to_string()));
            }
            config.outbox_max_attempts = u32::try_from(attempts)
                .map_err(|_| LaunchError::Config(format!("LAUNCH_OUTBOX_MAX_ATTEMPTS too large: {}", n)))?;
        }

        if let Some(project_id) = get("FIRESTORE_PROJECT_ID") {
            let endpoint = get("FIRESTORE_ENDPOINT");
            if let Some(endpoint) = &endpoint {
                url::Url::parse(endpoint)
                    .map_err(|e| LaunchError::Config(format!("Invalid FIRESTORE_ENDPOINT {}: {}", endpoint, e)))?;
            }
            config.firestore = Some(FirestoreConfig {
                project_id,
                database: get("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
                api_key: get("FIRESTORE_API_KEY"),
                endpoint,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// 백그라운드 작업을 띄우기 전 확인 (주기 0은 `tokio::time::interval`이 거부)
    pub fn validate(&self) -> LaunchResult<()> {
        if self.poll_interval.is_zero() || self.flush_interval.is_zero() {
            return Err(LaunchError::Config("poll and flush intervals must be non-zero".to_string()));
        }
        if self.outbox_max_attempts == 0 {
            return Err(LaunchError::Config("outbox max attempts must be at least 1".to_string()));
        }
        if self.backend == StoreBackend::Firestore && self.firestore.is_none() {
            return Err(LaunchError::Config(
                "FIRESTORE_PROJECT_ID is required for the firestore backend".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> LaunchResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| LaunchError::Config(format!("{} must be a non-negative integer, got {}", key, raw)))
}

fn parse_interval(key: &str, raw: &str) -> LaunchResult<Duration> {
    match parse_number(key, raw)? {
        0 => Err(LaunchError::Config(format!("{} must be greater than 0", key))),
        ms => Ok(Duration::from_millis(ms)),
    }
}

/// `.env.local`을 찾을 상위 디렉터리 수 (src-tauri 등 하위 폴더에서 실행하는 경우)
const ENV_LOCAL_SEARCH_DEPTH: usize = 4;

/// `.env.local`(가까운 상위 디렉터리) → `.env` 순으로 로드. 이미 설정된 값은 유지
fn load_env_files() {
    if let Some(path) = locate_env_local() {
        load_env_local(&path);
    }
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("[Config] ignoring unreadable .env: {}", e);
        }
    }
}

fn locate_env_local() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .take(ENV_LOCAL_SEARCH_DEPTH + 1)
        .map(|dir| dir.join(".env.local"))
        .find(|path| path.is_file())
}

/// dotenvy가 거부하는 파일(메모나 코드 블록이 섞인 경우)은 설정 줄만 골라 읽음
fn load_env_local(path: &Path) {
    let strict = match dotenvy::from_path(path) {
        Ok(()) => return,
        Err(e) => e,
    };
    match read_env_pairs(path) {
        Ok(pairs) => {
            let mut applied = 0;
            for (key, value) in pairs {
                if std::env::var_os(&key).is_none() {
                    std::env::set_var(key, value);
                    applied += 1;
                }
            }
            tracing::debug!(
                "[Config] {} settings from {} ({})",
                applied,
                path.display(),
                strict
            );
        }
        Err(e) => tracing::warn!("[Config] cannot read {}: {}", path.display(), e),
    }
}

fn read_env_pairs(path: &Path) -> std::io::Result<Vec<(String, String)>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().filter_map(env_pair).collect())
}

/// `KEY=VALUE` 한 줄 (KEY는 대문자/숫자/밑줄). 나머지 줄은 무시
fn env_pair(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let key_ok = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if !key_ok {
        return None;
    }
    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(value);
    Some((key.to_string(), unquoted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("launch-board.db"));
        assert_eq!(config.outbox_max_attempts, 5);
        assert!(config.firestore.is_none());
    }

    #[test]
    fn test_firestore_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("LAUNCH_STORE_BACKEND", "Firestore"),
            ("FIRESTORE_PROJECT_ID", "webtoon-admin"),
            ("FIRESTORE_API_KEY", "abc"),
            ("FIRESTORE_ENDPOINT", "http://localhost:8080/v1/"),
            ("LAUNCH_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.backend, StoreBackend::Firestore);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        let firestore = config.firestore.unwrap();
        assert_eq!(
            firestore.documents_url(),
            "http://localhost:8080/v1/projects/webtoon-admin/databases/(default)/documents"
        );
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("LAUNCH_STORE_BACKEND", "mongo")])),
            Err(LaunchError::Config(_))
        ));
        assert!(AppConfig::from_lookup(lookup(&[("LAUNCH_STORE_BACKEND", "firestore")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("LAUNCH_OUTBOX_MAX_ATTEMPTS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("LAUNCH_FLUSH_INTERVAL_MS", "soon")])).is_err());
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("LAUNCH_FLUSH_INTERVAL_MS", "0")])),
            Err(LaunchError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("LAUNCH_POLL_INTERVAL_MS", "0")])),
            Err(LaunchError::Config(_))
        ));

        let zero_flush = AppConfig {
            flush_interval: Duration::ZERO,
            ..AppConfig::in_memory()
        };
        assert!(zero_flush.validate().is_err());
    }

    #[test]
    fn test_env_pair_accepts_only_setting_lines() {
        assert_eq!(
            env_pair("export LAUNCH_DB_PATH = 'data/launch.db'"),
            Some(("LAUNCH_DB_PATH".to_string(), "data/launch.db".to_string()))
        );
        assert_eq!(env_pair("FIRESTORE_API_KEY=\"a=b\""), Some(("FIRESTORE_API_KEY".to_string(), "a=b".to_string())));
        assert_eq!(env_pair("EMPTY="), Some(("EMPTY".to_string(), String::new())));
        assert_eq!(env_pair("# LAUNCH_DB_PATH=x"), None);
        assert_eq!(env_pair("lower_case=1"), None);
        assert_eq!(env_pair("9LIVES=1"), None);
        assert_eq!(env_pair("```"), None);
    }

    #[test]
    fn test_env_local_with_notes_falls_back_to_setting_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env.local");
        std::fs::write(
            &path,
            "# 설정 메모\n```\nLAUNCH_TEST_ENV_LOCAL_KEY=\"quoted\"\nnot a pair\nlower_case=1\n```\n",
        )
        .unwrap();

        let pairs = read_env_pairs(&path).unwrap();
        assert_eq!(pairs, vec![("LAUNCH_TEST_ENV_LOCAL_KEY".to_string(), "quoted".to_string())]);

        load_env_local(&path);
        assert_eq!(std::env::var("LAUNCH_TEST_ENV_LOCAL_KEY").unwrap(), "quoted");
    }
}
