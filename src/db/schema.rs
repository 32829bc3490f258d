//! Database Schema
//!
//! SQLite 문서 저장소 스키마 정의

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 문서 테이블 (컬렉션별 JSON 문서)
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL CHECK (collection IN ('projects', 'launchProjects', 'launchStatuses')),
    id TEXT NOT NULL,
    data_json TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);

-- 문서 인덱스
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at);

-- 런칭 상태 키 조회용 인덱스
CREATE INDEX IF NOT EXISTS idx_launch_status_key
    ON documents(json_extract(data_json, '$.key'))
    WHERE collection = 'launchStatuses';

-- 작품 역참조 조회용 인덱스
CREATE INDEX IF NOT EXISTS idx_documents_project
    ON documents(collection, json_extract(data_json, '$.projectId'));
"#;
