//! 快照层（Snapshot）
//!
//! 唯一会写输出目录的地方：版本记录、差异比较、产物、目录清单

pub mod csv;
pub mod diff;
pub mod fs_util;
pub mod manifest;
pub mod publisher;
pub mod version;

pub use diff::{DatasetDiff, DiffEntry};
pub use manifest::{ManifestBuilder, PathEntry};
pub use publisher::{PublishOutcome, SnapshotInfo, SnapshotPublisher, MAX_HISTORY_COUNT, PER_PAGE_SIZE};
pub use version::{DatasetVersionManager, RootVersionManager, VersionHistory};
