//! Dashboard statistics per role
//!
//! Every view is rebuilt from the record source on request by joining
//! records in memory; nothing is cached between requests.

use crate::error::RecordsResult;
use crate::source::{AttendanceQuery, RecordSource};
use crate::types::{AttendanceSummary, ScheduleEntry, Section, Student, Subject, Teacher};
use chrono::NaiveDate;
use schooldesk_core::Role;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Attendance rate (percent) under which guidance flags a student
pub const DEFAULT_GUIDANCE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardStats {
    Admin(AdminStats),
    Teacher(TeacherStats),
    Student(StudentStats),
    Parent(ParentStats),
    Guidance(GuidanceStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionCount {
    pub section_id: String,
    pub section_name: String,
    pub students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub teachers: usize,
    pub students: usize,
    pub parents: usize,
    pub sections: usize,
    pub subjects: usize,
    pub students_per_section: Vec<SectionCount>,
}

/// Schedule entry joined with display names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSlot {
    pub weekday: String,
    pub start: String,
    pub end: String,
    pub subject: String,
    pub section: String,
    pub teacher: String,
    pub room: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherStats {
    pub teacher: Teacher,
    pub advised_sections: Vec<Section>,
    pub student_count: usize,
    pub today: AttendanceSummary,
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStats {
    pub student: Student,
    pub section_name: String,
    pub attendance: AttendanceSummary,
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildSummary {
    pub student: Student,
    pub section_name: String,
    pub attendance: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentStats {
    pub children: Vec<ChildSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedStudent {
    pub student: Student,
    pub section_name: String,
    pub attendance: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceStats {
    pub threshold: f64,
    pub total_students: usize,
    /// Students below the threshold, lowest rate first
    pub flagged: Vec<FlaggedStudent>,
}

/// Builds dashboard statistics from a record source
#[derive(Clone)]
pub struct DashboardBuilder {
    source: Arc<dyn RecordSource>,
    guidance_threshold: f64,
}

impl DashboardBuilder {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            guidance_threshold: DEFAULT_GUIDANCE_THRESHOLD,
        }
    }

    pub fn with_guidance_threshold(mut self, threshold: f64) -> Self {
        self.guidance_threshold = threshold;
        self
    }

    /// Statistics for the dashboard of `role`, for the account `identity`
    pub async fn for_role(
        &self,
        role: &Role,
        identity: &str,
        today: NaiveDate,
    ) -> RecordsResult<DashboardStats> {
        debug!("Building {} dashboard for {}", role, identity);
        Ok(match role {
            Role::Admin => DashboardStats::Admin(self.admin().await?),
            Role::Teacher => DashboardStats::Teacher(self.teacher(identity, today).await?),
            Role::Parent => DashboardStats::Parent(self.parent(identity).await?),
            Role::Guidance => DashboardStats::Guidance(self.guidance().await?),
            Role::Student | Role::Unrecognized(_) => {
                DashboardStats::Student(self.student(identity).await?)
            }
        })
    }

    pub async fn admin(&self) -> RecordsResult<AdminStats> {
        let students = self.source.students(None).await?;
        let sections = self.source.sections().await?;

        let mut per_section: HashMap<&str, usize> = HashMap::new();
        for student in &students {
            *per_section.entry(student.section_id.as_str()).or_default() += 1;
        }

        let students_per_section = sections
            .iter()
            .map(|section| SectionCount {
                section_id: section.id.clone(),
                section_name: section.name.clone(),
                students: per_section.get(section.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        Ok(AdminStats {
            teachers: self.source.teachers().await?.len(),
            students: students.len(),
            parents: self.source.parents().await?.len(),
            sections: sections.len(),
            subjects: self.source.subjects().await?.len(),
            students_per_section,
        })
    }

    pub async fn teacher(&self, teacher_id: &str, today: NaiveDate) -> RecordsResult<TeacherStats> {
        let teacher = self.source.teacher(teacher_id).await?;
        let advised_sections: Vec<Section> = self
            .source
            .sections()
            .await?
            .into_iter()
            .filter(|section| section.adviser_id.as_deref() == Some(teacher_id))
            .collect();

        let mut student_count = 0;
        let mut today_summary = AttendanceSummary::default();
        for section in &advised_sections {
            student_count += self.source.students(Some(&section.id)).await?.len();
            let marks = self
                .source
                .attendance(&AttendanceQuery::on(today).for_section(section.id.clone()))
                .await?;
            today_summary.merge(&AttendanceSummary::from_entries(&marks));
        }

        let entries: Vec<ScheduleEntry> = self
            .source
            .schedule(None)
            .await?
            .into_iter()
            .filter(|entry| entry.teacher_id == teacher_id)
            .collect();

        Ok(TeacherStats {
            teacher,
            advised_sections,
            student_count,
            today: today_summary,
            schedule: self.slots(entries).await?,
        })
    }

    pub async fn student(&self, student_id: &str) -> RecordsResult<StudentStats> {
        let student = self.source.student(student_id).await?;
        let section_name = self.section_name(&student.section_id).await?;
        let marks = self
            .source
            .attendance(&AttendanceQuery::all().for_student(student_id))
            .await?;
        let entries = self.source.schedule(Some(&student.section_id)).await?;

        Ok(StudentStats {
            section_name,
            attendance: AttendanceSummary::from_entries(&marks),
            schedule: self.slots(entries).await?,
            student,
        })
    }

    pub async fn parent(&self, parent_id: &str) -> RecordsResult<ParentStats> {
        // Fails for unknown parents rather than showing an empty page
        self.source.parent(parent_id).await?;

        let mut children = Vec::new();
        for student in self.source.children_of(parent_id).await? {
            let marks = self
                .source
                .attendance(&AttendanceQuery::all().for_student(student.id.clone()))
                .await?;
            children.push(ChildSummary {
                section_name: self.section_name(&student.section_id).await?,
                attendance: AttendanceSummary::from_entries(&marks),
                student,
            });
        }

        Ok(ParentStats { children })
    }

    pub async fn guidance(&self) -> RecordsResult<GuidanceStats> {
        let students = self.source.students(None).await?;
        let sections = self.section_names().await?;
        let marks = self.source.attendance(&AttendanceQuery::all()).await?;

        let mut summaries: HashMap<&str, AttendanceSummary> = HashMap::new();
        for mark in &marks {
            summaries
                .entry(mark.student_id.as_str())
                .or_default()
                .add(mark.status);
        }

        let mut flagged: Vec<FlaggedStudent> = students
            .iter()
            .filter_map(|student| {
                let summary = summaries.get(student.id.as_str()).copied()?;
                let rate = summary.rate()?;
                (rate < self.guidance_threshold).then(|| FlaggedStudent {
                    student: student.clone(),
                    section_name: sections
                        .get(&student.section_id)
                        .cloned()
                        .unwrap_or_else(|| student.section_id.clone()),
                    attendance: summary,
                })
            })
            .collect();

        flagged.sort_by(|a, b| {
            let a = a.attendance.rate().unwrap_or(0.0);
            let b = b.attendance.rate().unwrap_or(0.0);
            a.total_cmp(&b)
        });

        Ok(GuidanceStats {
            threshold: self.guidance_threshold,
            total_students: students.len(),
            flagged,
        })
    }

    async fn section_name(&self, section_id: &str) -> RecordsResult<String> {
        Ok(self.source.section(section_id).await?.name)
    }

    async fn section_names(&self) -> RecordsResult<HashMap<String, String>> {
        Ok(self
            .source
            .sections()
            .await?
            .into_iter()
            .map(|section| (section.id, section.name))
            .collect())
    }

    /// Join schedule entries with names, ordered by weekday then start time
    async fn slots(&self, mut entries: Vec<ScheduleEntry>) -> RecordsResult<Vec<ScheduleSlot>> {
        entries.sort_by_key(|entry| (entry.weekday.num_days_from_monday(), entry.start));

        let sections = self.section_names().await?;
        let subjects: HashMap<String, Subject> = self
            .source
            .subjects()
            .await?
            .into_iter()
            .map(|subject| (subject.id.clone(), subject))
            .collect();
        let teachers: HashMap<String, Teacher> = self
            .source
            .teachers()
            .await?
            .into_iter()
            .map(|teacher| (teacher.id.clone(), teacher))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| ScheduleSlot {
                weekday: entry.weekday.to_string(),
                start: entry.start.format("%H:%M").to_string(),
                end: entry.end.format("%H:%M").to_string(),
                subject: subjects
                    .get(&entry.subject_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| entry.subject_id.clone()),
                section: sections
                    .get(&entry.section_id)
                    .cloned()
                    .unwrap_or_else(|| entry.section_id.clone()),
                teacher: teachers
                    .get(&entry.teacher_id)
                    .map(Teacher::full_name)
                    .unwrap_or_else(|| entry.teacher_id.clone()),
                room: entry.room.unwrap_or_default(),
            })
            .collect())
    }
}

impl std::fmt::Debug for DashboardBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardBuilder")
            .field("guidance_threshold", &self.guidance_threshold)
            .finish_non_exhaustive()
    }
}
