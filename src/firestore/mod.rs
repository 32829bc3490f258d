//! Firestore REST API 연동 모듈
//!
//! 관리형 문서 데이터베이스(Firestore)를 REST로 직접 호출합니다.

pub mod client;
pub mod types;

pub use client::FirestoreStore;
