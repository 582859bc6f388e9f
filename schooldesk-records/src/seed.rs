//! Demo school used by `seed_demo_data`

use crate::source::RecordSet;
use crate::types::{
    AttendanceEntry, AttendanceStatus, Parent, ScheduleEntry, Section, Student, Subject, Teacher,
};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

/// School days of attendance generated for the demo
const DEMO_SCHOOL_DAYS: usize = 10;

/// Demo school with attendance for the ten school days ending at `today`
pub fn demo_records(today: NaiveDate) -> RecordSet {
    let teachers = vec![
        teacher("tch-001", "Maria", "Santos", "Mathematics"),
        teacher("tch-002", "Jose", "Cruz", "Science"),
        teacher("tch-003", "Liza", "Bautista", "Languages"),
    ];

    let sections = vec![
        Section {
            id: "sec-7a".to_string(),
            name: "Grade 7 - Sampaguita".to_string(),
            grade_level: 7,
            adviser_id: Some("tch-001".to_string()),
        },
        Section {
            id: "sec-8b".to_string(),
            name: "Grade 8 - Narra".to_string(),
            grade_level: 8,
            adviser_id: Some("tch-002".to_string()),
        },
    ];

    let parents = vec![
        parent("par-001", "Ana", "Reyes"),
        parent("par-002", "Ramon", "Garcia"),
        parent("par-003", "Elena", "Flores"),
    ];

    let students = vec![
        student("stu-001", "Miguel", "Reyes", "sec-7a", Some("par-001")),
        student("stu-002", "Sofia", "Reyes", "sec-8b", Some("par-001")),
        student("stu-003", "Carlo", "Garcia", "sec-7a", Some("par-002")),
        student("stu-004", "Bea", "Flores", "sec-7a", Some("par-003")),
        student("stu-005", "Paolo", "Mendoza", "sec-8b", None),
        student("stu-006", "Isabel", "Ramos", "sec-8b", None),
    ];

    let subjects = vec![
        subject("sub-math", "MATH", "Mathematics"),
        subject("sub-sci", "SCI", "Science"),
        subject("sub-eng", "ENG", "English"),
        subject("sub-fil", "FIL", "Filipino"),
    ];

    let mwf = [Weekday::Mon, Weekday::Wed, Weekday::Fri];
    let tth = [Weekday::Tue, Weekday::Thu];
    let daily = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    let mut schedule = Vec::new();
    let mut add = |section: &str, subject: &str, teacher: &str, days: &[Weekday], start: u32, room: &str| {
        for day in days {
            let id = format!("sch-{:03}", schedule.len() + 1);
            schedule.push(ScheduleEntry {
                id,
                section_id: section.to_string(),
                subject_id: subject.to_string(),
                teacher_id: teacher.to_string(),
                weekday: *day,
                start: at(start, 0),
                end: at(start + 1, 0),
                room: Some(room.to_string()),
            });
        }
    };
    add("sec-7a", "sub-math", "tch-001", &mwf, 7, "Room 101");
    add("sec-7a", "sub-sci", "tch-002", &tth, 7, "Lab 1");
    add("sec-7a", "sub-eng", "tch-003", &daily, 9, "Room 101");
    add("sec-8b", "sub-sci", "tch-002", &mwf, 8, "Lab 1");
    add("sec-8b", "sub-math", "tch-001", &tth, 8, "Room 204");
    add("sec-8b", "sub-fil", "tch-003", &daily, 10, "Room 204");

    let mut attendance = Vec::new();
    for (day_index, date) in school_days_until(today, DEMO_SCHOOL_DAYS).into_iter().enumerate() {
        for (student_index, student) in students.iter().enumerate() {
            attendance.push(AttendanceEntry {
                student_id: student.id.clone(),
                section_id: student.section_id.clone(),
                date,
                status: demo_status(student_index, day_index),
                remarks: None,
            });
        }
    }

    RecordSet {
        teachers,
        students,
        parents,
        sections,
        subjects,
        schedule,
        attendance,
    }
}

/// The last `count` weekdays up to and including `today`, oldest first
fn school_days_until(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut cursor = Some(today);
    while let Some(date) = cursor {
        if days.len() == count {
            break;
        }
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(date);
        }
        cursor = date.pred_opt();
    }
    days.reverse();
    days
}

fn demo_status(student_index: usize, day_index: usize) -> AttendanceStatus {
    // stu-005 is the chronic absentee guidance should see
    if student_index == 4 {
        return if day_index % 3 == 0 {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        };
    }

    match (student_index * 7 + day_index * 3) % 13 {
        0 => AttendanceStatus::Absent,
        1 => AttendanceStatus::Late,
        2 => AttendanceStatus::Excused,
        _ => AttendanceStatus::Present,
    }
}

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn teacher(id: &str, first: &str, last: &str, department: &str) -> Teacher {
    Teacher {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: demo_email(first, last),
        department: Some(department.to_string()),
    }
}

fn parent(id: &str, first: &str, last: &str) -> Parent {
    Parent {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: demo_email(first, last),
        phone: None,
    }
}

fn student(id: &str, first: &str, last: &str, section: &str, guardian: Option<&str>) -> Student {
    Student {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: demo_email(first, last),
        section_id: section.to_string(),
        guardian_id: guardian.map(str::to_string),
    }
}

fn subject(id: &str, code: &str, name: &str) -> Subject {
    Subject {
        id: id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
    }
}

/// Email address used for a demo person
pub fn demo_email(first: &str, last: &str) -> String {
    format!(
        "{}.{}@schooldesk.test",
        first.to_lowercase(),
        last.to_lowercase()
    )
}
