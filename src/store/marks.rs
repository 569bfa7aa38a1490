/*!
The marks table.

```csv
student,subject,marks
jsmith,Math,40
jsmith,Science,60
```

Row order within a student is taken to be chronological.
*/
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ensure_table, read_table, write_table, StoreError};

static HEADER: &[&str] = &["student", "subject", "marks"];

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MarkRecord {
    pub student: String,
    pub subject: String,
    pub marks: f64,
}

impl MarkRecord {
    pub fn from_csv_line(
        row: &csv::StringRecord
    ) -> Result<MarkRecord, String> {
        log::trace!("MarkRecord::from_csv_line( {:?} ) called.", row);

        let student = match row.get(0) {
            Some(s) => s.to_owned(),
            None => { return Err("no student".to_owned()); },
        };
        let subject = match row.get(1) {
            Some(s) => s.to_owned(),
            None => { return Err("no subject".to_owned()); },
        };
        let marks: f64 = match row.get(2) {
            Some(s) => s.trim().parse()
                .map_err(|_| format!("Unable to parse {:?} as marks.", s))?,
            None => { return Err("no marks".to_owned()); },
        };
        if !marks.is_finite() {
            return Err(format!("{} is not a usable marks value.", marks));
        }

        Ok(MarkRecord { student, subject, marks })
    }

    pub fn to_csv_line(&self) -> [String; 3] {
        [
            self.student.clone(),
            self.subject.clone(),
            self.marks.to_string(),
        ]
    }
}

/// Why a teacher's edit wasn't saved.
#[derive(Debug, PartialEq)]
pub enum SaveError {
    /// Message to show the teacher.
    Rejected(String),
    Store(StoreError),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SaveError::Rejected(msg) => write!(f, "{}", msg),
            SaveError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<StoreError> for SaveError {
    fn from(e: StoreError) -> SaveError { SaveError::Store(e) }
}

/// One row of a teacher's edit; the student is implied.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SubjectMark {
    pub subject: String,
    pub marks: f64,
}

/**
Ensure a teacher's submitted rows are fit to save.

Subjects may not be blank, and no subject may appear twice (ignoring case
and surrounding whitespace).
*/
pub fn check_subject_marks(rows: &[SubjectMark]) -> Result<(), String> {
    let mut seen: Vec<String> = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let key = row.subject.trim().to_lowercase();
        if key.is_empty() {
            return Err(crate::store::users::EMPTY_FIELDS.to_owned());
        }
        if seen.contains(&key) {
            return Err(format!("Duplicate subject: {}", row.subject.trim()));
        }
        seen.push(key);
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct MarkStore {
    path: PathBuf,
}

impl MarkStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn ensure_file(&self) -> Result<(), StoreError> {
        ensure_table(&self.path, HEADER)
    }

    fn read(&self) -> Result<Vec<MarkRecord>, StoreError> {
        read_table(&self.path, HEADER, MarkRecord::from_csv_line)
    }

    /// Every record, in file order. An unreadable table is logged and
    /// treated as empty.
    pub fn load(&self) -> Vec<MarkRecord> {
        log::trace!("MarkStore::load() called.");

        match self.read() {
            Ok(marks) => marks,
            Err(e) => {
                log::error!(
                    "Unable to read marks table {}: {}",
                    self.path.display(), &e
                );
                Vec::new()
            },
        }
    }

    pub fn get_marks_by_student(&self, student: &str) -> Vec<MarkRecord> {
        log::trace!("MarkStore::get_marks_by_student( {:?} ) called.", student);

        self.load().into_iter()
            .filter(|m| m.student == student)
            .collect()
    }

    /**
    Replace every row belonging to `student` with `rows`.

    Other students' rows keep their relative order; the new rows go at the
    end of the table. Returns the number of rows removed.
    */
    pub fn replace_student_marks(
        &self,
        student: &str,
        rows: &[SubjectMark],
    ) -> Result<usize, SaveError> {
        log::trace!(
            "MarkStore::replace_student_marks( {:?}, [ {} rows ] ) called.",
            student, rows.len()
        );

        check_subject_marks(rows).map_err(SaveError::Rejected)?;

        let mut marks = self.read()
            .map_err(|e| e.annotate("Unable to read marks table"))?;
        let n_before = marks.len();
        marks.retain(|m| m.student != student);
        let n_removed = n_before - marks.len();

        marks.extend(rows.iter().map(|r| MarkRecord {
            student: student.to_owned(),
            subject: r.subject.trim().to_owned(),
            marks: r.marks,
        }));

        write_table(&self.path, HEADER, marks.iter().map(MarkRecord::to_csv_line))
            .map_err(|e| e.annotate("Unable to write marks table"))?;

        log::info!(
            "Replaced {} marks rows for {:?} with {}.",
            n_removed, student, rows.len()
        );
        Ok(n_removed)
    }
}
