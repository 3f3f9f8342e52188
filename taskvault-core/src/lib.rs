//! Taskvault Core - Entity Types
//!
//! Pure data structures with no I/O. All other crates depend on this.
//! This crate contains the task entity, its enumerations, the sparse patch
//! type, and the error taxonomy shared by the store, cache, and API layers.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use entities::{NewTask, Task, TaskPatch};
pub use enums::{EnumParseError, RepeatKind, TaskStatus};
pub use error::{
    CacheError, CacheResult, ConfigError, StoreError, StoreResult, TaskError, TaskResult,
    ValidationError,
};
pub use identity::{new_task_id, TaskId, Timestamp, UserId};
