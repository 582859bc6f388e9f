//! Attendance reports over a date range

use crate::error::{RecordsError, RecordsResult};
use crate::source::{AttendanceQuery, RecordSource};
use crate::types::AttendanceSummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Parameters of an attendance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub section_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub student_id: String,
    pub student_name: String,
    pub section_name: String,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub section_id: Option<String>,
    /// Ordered by section name, then last and first name
    pub rows: Vec<ReportRow>,
    pub totals: AttendanceSummary,
}

impl AttendanceReport {
    /// Build a report with one row per student in scope.
    ///
    /// Students without marks in the range still get a row with no rate.
    pub async fn build(
        source: &dyn RecordSource,
        request: &ReportRequest,
    ) -> RecordsResult<AttendanceReport> {
        if request.from > request.to {
            return Err(RecordsError::InvalidRange {
                from: request.from,
                to: request.to,
            });
        }

        let section_names: HashMap<String, String> = source
            .sections()
            .await?
            .into_iter()
            .map(|section| (section.id, section.name))
            .collect();

        if let Some(section_id) = &request.section_id {
            if !section_names.contains_key(section_id) {
                return Err(RecordsError::not_found("section", section_id.as_str()));
            }
        }

        let mut query = AttendanceQuery::between(request.from, request.to);
        query.section_id = request.section_id.clone();
        let marks = source.attendance(&query).await?;

        let mut summaries: HashMap<&str, AttendanceSummary> = HashMap::new();
        for mark in &marks {
            summaries
                .entry(mark.student_id.as_str())
                .or_default()
                .add(mark.status);
        }

        let mut students = source.students(request.section_id.as_deref()).await?;
        students.sort_by(|a, b| {
            let section_a = section_names.get(&a.section_id).unwrap_or(&a.section_id);
            let section_b = section_names.get(&b.section_id).unwrap_or(&b.section_id);
            section_a
                .cmp(section_b)
                .then_with(|| a.last_name.cmp(&b.last_name))
                .then_with(|| a.first_name.cmp(&b.first_name))
        });

        let mut totals = AttendanceSummary::default();
        let rows: Vec<ReportRow> = students
            .into_iter()
            .map(|student| {
                let summary = summaries
                    .get(student.id.as_str())
                    .copied()
                    .unwrap_or_default();
                totals.merge(&summary);
                ReportRow {
                    student_name: format!("{}, {}", student.last_name, student.first_name),
                    section_name: section_names
                        .get(&student.section_id)
                        .cloned()
                        .unwrap_or_else(|| student.section_id.clone()),
                    student_id: student.id,
                    summary,
                }
            })
            .collect();

        info!(
            "Attendance report {}..{}: {} students, {} marks",
            request.from,
            request.to,
            rows.len(),
            totals.total()
        );

        Ok(AttendanceReport {
            from: request.from,
            to: request.to,
            section_id: request.section_id.clone(),
            rows,
            totals,
        })
    }
}
