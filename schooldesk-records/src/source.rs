//! Record sources
//!
//! [`RecordSource`] is the read side of the school database. The bundled
//! [`MemoryRecordSource`] keeps everything in memory behind a tokio lock.

use crate::error::{RecordsError, RecordsResult};
use crate::types::{
    AttendanceEntry, Parent, ScheduleEntry, Section, Student, Subject, Teacher,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Filter for attendance lookups; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub section_id: Option<String>,
    pub student_id: Option<String>,
}

impl AttendanceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self::between(date, date)
    }

    pub fn for_section<S: Into<String>>(mut self, section_id: S) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    pub fn for_student<S: Into<String>>(mut self, student_id: S) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn matches(&self, entry: &AttendanceEntry) -> bool {
        self.from.map_or(true, |from| entry.date >= from)
            && self.to.map_or(true, |to| entry.date <= to)
            && self
                .section_id
                .as_ref()
                .map_or(true, |section| &entry.section_id == section)
            && self
                .student_id
                .as_ref()
                .map_or(true, |student| &entry.student_id == student)
    }
}

/// Read access to school records
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn teachers(&self) -> RecordsResult<Vec<Teacher>>;

    /// Students, optionally limited to one section
    async fn students(&self, section_id: Option<&str>) -> RecordsResult<Vec<Student>>;

    async fn parents(&self) -> RecordsResult<Vec<Parent>>;

    async fn sections(&self) -> RecordsResult<Vec<Section>>;

    async fn subjects(&self) -> RecordsResult<Vec<Subject>>;

    /// Weekly schedule, optionally limited to one section
    async fn schedule(&self, section_id: Option<&str>) -> RecordsResult<Vec<ScheduleEntry>>;

    async fn attendance(&self, query: &AttendanceQuery) -> RecordsResult<Vec<AttendanceEntry>>;

    /// Store an attendance mark, replacing the student's mark for that date
    async fn record_attendance(&self, entry: AttendanceEntry) -> RecordsResult<()>;

    async fn teacher(&self, id: &str) -> RecordsResult<Teacher> {
        self.teachers()
            .await?
            .into_iter()
            .find(|teacher| teacher.id == id)
            .ok_or_else(|| RecordsError::not_found("teacher", id))
    }

    async fn student(&self, id: &str) -> RecordsResult<Student> {
        self.students(None)
            .await?
            .into_iter()
            .find(|student| student.id == id)
            .ok_or_else(|| RecordsError::not_found("student", id))
    }

    async fn parent(&self, id: &str) -> RecordsResult<Parent> {
        self.parents()
            .await?
            .into_iter()
            .find(|parent| parent.id == id)
            .ok_or_else(|| RecordsError::not_found("parent", id))
    }

    async fn section(&self, id: &str) -> RecordsResult<Section> {
        self.sections()
            .await?
            .into_iter()
            .find(|section| section.id == id)
            .ok_or_else(|| RecordsError::not_found("section", id))
    }

    /// Students whose guardian is `parent_id`
    async fn children_of(&self, parent_id: &str) -> RecordsResult<Vec<Student>> {
        Ok(self
            .students(None)
            .await?
            .into_iter()
            .filter(|student| student.guardian_id.as_deref() == Some(parent_id))
            .collect())
    }
}

/// Complete set of school records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub teachers: Vec<Teacher>,
    pub students: Vec<Student>,
    pub parents: Vec<Parent>,
    pub sections: Vec<Section>,
    pub subjects: Vec<Subject>,
    pub schedule: Vec<ScheduleEntry>,
    pub attendance: Vec<AttendanceEntry>,
}

/// In-memory record source
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Arc<RwLock<RecordSet>>,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: RecordSet) -> Self {
        info!(
            "Loaded {} students, {} teachers and {} attendance marks",
            records.students.len(),
            records.teachers.len(),
            records.attendance.len()
        );
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Snapshot of everything held
    pub async fn snapshot(&self) -> RecordSet {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn teachers(&self) -> RecordsResult<Vec<Teacher>> {
        Ok(self.records.read().await.teachers.clone())
    }

    async fn students(&self, section_id: Option<&str>) -> RecordsResult<Vec<Student>> {
        let records = self.records.read().await;
        Ok(records
            .students
            .iter()
            .filter(|student| section_id.map_or(true, |section| student.section_id == section))
            .cloned()
            .collect())
    }

    async fn parents(&self) -> RecordsResult<Vec<Parent>> {
        Ok(self.records.read().await.parents.clone())
    }

    async fn sections(&self) -> RecordsResult<Vec<Section>> {
        Ok(self.records.read().await.sections.clone())
    }

    async fn subjects(&self) -> RecordsResult<Vec<Subject>> {
        Ok(self.records.read().await.subjects.clone())
    }

    async fn schedule(&self, section_id: Option<&str>) -> RecordsResult<Vec<ScheduleEntry>> {
        let records = self.records.read().await;
        Ok(records
            .schedule
            .iter()
            .filter(|entry| section_id.map_or(true, |section| entry.section_id == section))
            .cloned()
            .collect())
    }

    async fn attendance(&self, query: &AttendanceQuery) -> RecordsResult<Vec<AttendanceEntry>> {
        let records = self.records.read().await;
        Ok(records
            .attendance
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect())
    }

    async fn record_attendance(&self, entry: AttendanceEntry) -> RecordsResult<()> {
        let mut records = self.records.write().await;
        if !records.students.iter().any(|s| s.id == entry.student_id) {
            return Err(RecordsError::not_found("student", entry.student_id));
        }

        records
            .attendance
            .retain(|e| !(e.student_id == entry.student_id && e.date == entry.date));
        debug!(
            "Recorded {:?} for {} on {}",
            entry.status, entry.student_id, entry.date
        );
        records.attendance.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceStatus;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn entry(student: &str, day: u32, status: AttendanceStatus) -> AttendanceEntry {
        AttendanceEntry {
            student_id: student.to_string(),
            section_id: "sec-a".to_string(),
            date: date(day),
            status,
            remarks: None,
        }
    }

    fn source() -> MemoryRecordSource {
        MemoryRecordSource::from_records(RecordSet {
            students: vec![Student {
                id: "stu-1".to_string(),
                first_name: "Lia".to_string(),
                last_name: "Tan".to_string(),
                email: "lia@school.test".to_string(),
                section_id: "sec-a".to_string(),
                guardian_id: Some("par-1".to_string()),
            }],
            attendance: vec![
                entry("stu-1", 1, AttendanceStatus::Present),
                entry("stu-1", 2, AttendanceStatus::Absent),
                entry("stu-1", 3, AttendanceStatus::Late),
            ],
            ..RecordSet::default()
        })
    }

    #[tokio::test]
    async fn test_attendance_query_filters_by_range() {
        let source = source();
        let entries = source
            .attendance(&AttendanceQuery::between(date(2), date(3)))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let none = source
            .attendance(&AttendanceQuery::all().for_section("sec-b"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_record_attendance_replaces_same_day() {
        let source = source();
        source
            .record_attendance(entry("stu-1", 2, AttendanceStatus::Excused))
            .await
            .unwrap();

        let day = source.attendance(&AttendanceQuery::on(date(2))).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].status, AttendanceStatus::Excused);
    }

    #[tokio::test]
    async fn test_lookups() {
        let source = source();
        assert_eq!(source.student("stu-1").await.unwrap().first_name, "Lia");
        assert_eq!(
            source.student("stu-9").await.unwrap_err(),
            RecordsError::not_found("student", "stu-9")
        );
        assert_eq!(source.children_of("par-1").await.unwrap().len(), 1);
        assert!(source
            .record_attendance(entry("stu-9", 1, AttendanceStatus::Present))
            .await
            .is_err());
    }
}
