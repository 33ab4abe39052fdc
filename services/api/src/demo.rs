use chrono::NaiveDate;
use clap::Args;
use gradebook::error::AppError;
use gradebook::records::{
    Course, InMemoryRecordStore, NewCourse, NewResult, NewSemester, NewStudent,
    NotificationDispatcher, RecordsService, RecordsServiceError, ResultImporter, Semester,
    SmsTransport, Student, TransportError,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional results sheet (student_code,course_code,semester_name,semester_year,score)
    /// imported after the sample results.
    #[arg(long)]
    pub(crate) results_csv: Option<PathBuf>,
    /// Skip the SMS notification portion of the demo.
    #[arg(long)]
    pub(crate) skip_notifications: bool,
}

/// Prints each SMS instead of sending it.
struct ConsoleTransport;

impl SmsTransport for ConsoleTransport {
    fn send(&self, destination_phone: &str, message: &str) -> Result<(), TransportError> {
        println!("  SMS -> {destination_phone}: {message}");
        Ok(())
    }
}

struct SampleCohort {
    students: Vec<Student>,
    courses: Vec<Course>,
    semesters: Vec<Semester>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        results_csv,
        skip_notifications,
    } = args;

    println!("Student records demo");
    let store = Arc::new(InMemoryRecordStore::default());
    let service = RecordsService::new(store.clone());

    let cohort = match seed_cohort(&service) {
        Ok(cohort) => cohort,
        Err(err) => {
            println!("  Sample data rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- {} students | {} courses | {} semesters",
        cohort.students.len(),
        cohort.courses.len(),
        cohort.semesters.len()
    );

    // score per (student, course) for each semester in order
    let sheet: [[[f64; 3]; 3]; 2] = [
        [[78.0, 71.0, 66.0], [58.0, 49.0, 62.0], [35.0, 44.0, 51.0]],
        [[81.0, 74.0, 90.0], [52.0, 41.0, 47.0], [63.0, 69.0, 72.0]],
    ];
    for (semester, rows) in cohort.semesters.iter().zip(sheet) {
        for (student, scores) in cohort.students.iter().zip(rows) {
            for (course, score) in cohort.courses.iter().zip(scores) {
                let entry = NewResult {
                    student_id: student.id,
                    course_id: course.id,
                    semester_id: semester.id,
                    score,
                };
                if let Err(err) = service.record_result(entry) {
                    println!("  Result rejected for {}: {}", student.student_code, err);
                }
            }
        }
    }

    if let Some(path) = results_csv {
        let report = ResultImporter::from_path(&service, &path)?;
        println!(
            "- Imported {} results from {} ({} rows skipped)",
            report.imported.len(),
            path.display(),
            report.issues.len()
        );
        for issue in &report.issues {
            println!("    row {}: {}", issue.row, issue.reason);
        }
    }

    println!("\nSemester close-out");
    for semester in &cohort.semesters {
        for student in &cohort.students {
            match service.close_semester(student.id, semester.id) {
                Ok(record) => println!(
                    "- {} {}: GPA {:.2} | CGPA {:.2} over {} credit units",
                    student.student_code,
                    semester.label(),
                    record.semester_gpa,
                    record.cumulative_gpa,
                    record.total_credit_units
                ),
                Err(err) => println!("- {} {}: {}", student.student_code, semester.label(), err),
            }
        }
    }

    println!("\nAcademic standing");
    for student in &cohort.students {
        let standing = match service.standing(student.id) {
            Ok(standing) => standing,
            Err(err) => {
                println!("- {}: standing unavailable ({})", student.full_name(), err);
                continue;
            }
        };
        println!(
            "- {} ({}): CGPA {:.2} -> {} | risk {} | trend {:?}",
            student.full_name(),
            student.student_code,
            standing.cgpa,
            standing.classification_label,
            standing.advisory.risk_level.label(),
            standing.advisory.trend
        );
        for recommendation in &standing.advisory.recommendations {
            println!("    * {}", recommendation);
        }
    }

    match service.summary() {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("\nRecords summary:\n{}", json),
            Err(err) => println!("\nRecords summary unavailable: {}", err),
        },
        Err(err) => println!("\nRecords summary unavailable: {}", err),
    }

    if skip_notifications {
        return Ok(());
    }

    println!("\nResult notifications");
    let dispatcher = NotificationDispatcher::new(store, Arc::new(ConsoleTransport));
    let summary = dispatcher.notify_pending()?;
    println!("- {}", summary.message());

    Ok(())
}

fn seed_cohort(
    service: &RecordsService<InMemoryRecordStore>,
) -> Result<SampleCohort, RecordsServiceError> {
    let students = [
        ("CSC/2022/014", "Chiamaka", "Nwosu", "+2348031234014"),
        ("CSC/2022/027", "Ibrahim", "Bello", "+2348031234027"),
        ("CSC/2022/033", "Folake", "Adeyemi", "+2348031234033"),
    ]
    .into_iter()
    .map(|(code, first_name, last_name, phone_number)| {
        service.register_student(NewStudent {
            student_code: code.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!(
                "{}.{}@students.example.edu",
                first_name.to_ascii_lowercase(),
                last_name.to_ascii_lowercase()
            ),
            phone_number: phone_number.to_string(),
            program: "Computer Science".to_string(),
            year_of_study: 2,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    let courses = [
        ("CSC201", "Data Structures", 3),
        ("CSC205", "Discrete Mathematics", 2),
        ("CSC211", "Computer Architecture", 4),
    ]
    .into_iter()
    .map(|(code, title, credit_units)| {
        service.add_course(NewCourse {
            code: code.to_string(),
            title: title.to_string(),
            credit_units,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    let semesters = [
        ("First", (2023, 10, 2), (2024, 2, 16), false),
        ("Second", (2024, 3, 4), (2024, 7, 26), true),
    ]
    .into_iter()
    .map(|(name, start, end, is_current)| {
        service.add_semester(NewSemester {
            name: name.to_string(),
            year: start.0,
            start_date: date(start),
            end_date: date(end),
            is_current,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    Ok(SampleCohort {
        students,
        courses,
        semesters,
    })
}

fn date((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
