//! Launch Board Commands Module
//!
//! 프론트엔드에서 호출하는 명령 정의. 인자는 camelCase JSON, 결과는 `CommandResult`.

pub mod launch;
pub mod project;
