//! School record types

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub section_id: String,
    /// Parent account responsible for the student
    #[serde(default)]
    pub guardian_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub grade_level: u8,
    /// Teacher advising the section
    #[serde(default)]
    pub adviser_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// One weekly class meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub section_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Whether the student was in class; late arrivals count
    pub fn attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

/// Daily attendance mark of one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub section_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Counts of attendance marks and the resulting rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
}

impl AttendanceSummary {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceEntry>,
    {
        let mut summary = Self::default();
        for entry in entries {
            summary.add(entry.status);
        }
        summary
    }

    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    pub fn merge(&mut self, other: &AttendanceSummary) {
        self.present += other.present;
        self.absent += other.absent;
        self.late += other.late;
        self.excused += other.excused;
    }

    pub fn total(&self) -> u32 {
        self.present + self.absent + self.late + self.excused
    }

    /// Percentage of marks where the student attended; `None` without marks
    pub fn rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(f64::from(self.present + self.late) * 100.0 / f64::from(total))
        }
    }

    pub fn rate_label(&self) -> String {
        match self.rate() {
            Some(rate) => format!("{:.1}%", rate),
            None => "n/a".to_string(),
        }
    }
}

macro_rules! impl_full_name {
    ($($ty:ty),*) => {
        $(impl $ty {
            pub fn full_name(&self) -> String {
                format!("{} {}", self.first_name, self.last_name)
            }
        })*
    };
}

impl_full_name!(Teacher, Student, Parent);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_counts_as_attended() {
        let mut summary = AttendanceSummary::default();
        summary.add(AttendanceStatus::Present);
        summary.add(AttendanceStatus::Late);
        summary.add(AttendanceStatus::Absent);
        summary.add(AttendanceStatus::Excused);

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.rate(), Some(50.0));
        assert_eq!(summary.rate_label(), "50.0%");
    }

    #[test]
    fn test_empty_summary_has_no_rate() {
        let summary = AttendanceSummary::default();
        assert_eq!(summary.rate(), None);
        assert_eq!(summary.rate_label(), "n/a");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Excused).unwrap(),
            "\"excused\""
        );
    }
}
