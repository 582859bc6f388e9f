//! SchoolDesk Records - school data and the views built from it
//!
//! Holds the people, sections and schedules of a school plus daily
//! attendance, and joins them into per-role dashboard statistics and
//! attendance reports.

pub mod attendance;
pub mod error;
pub mod seed;
pub mod source;
pub mod stats;
pub mod types;

pub use attendance::{AttendanceReport, ReportRequest, ReportRow};
pub use error::{RecordsError, RecordsResult};
pub use seed::demo_records;
pub use source::{AttendanceQuery, MemoryRecordSource, RecordSet, RecordSource};
pub use stats::{
    AdminStats, ChildSummary, DashboardBuilder, DashboardStats, FlaggedStudent, GuidanceStats,
    ParentStats, ScheduleSlot, SectionCount, StudentStats, TeacherStats,
    DEFAULT_GUIDANCE_THRESHOLD,
};
pub use types::*;
