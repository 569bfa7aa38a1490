/*!
Flat-file storage.

Each table lives in its own CSV file with a header row:

```csv
username,password,role
```

```csv
student,subject,marks
```

Tables are read in their entirety whenever they are needed and rewritten in
their entirety whenever they change. Nothing is cached between requests.
*/
use std::fmt::Write;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub mod marks;
pub mod users;

pub use marks::MarkStore;
pub use users::UserStore;

#[derive(Debug, PartialEq)]
pub struct StoreError(String);

impl StoreError {
    /// Prepend some contextual `annotation` for the error.
    pub fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }

    pub fn display(&self) -> &str { &self.0 }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.0)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> StoreError {
        StoreError(format!("I/O: {}", &e))
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> StoreError {
        let mut s = format!("CSV: {}", &e);
        if let Some(p) = e.position() {
            // Writing to a String can't fail.
            let _ = write!(&mut s, " (line {})", p.line());
        }
        StoreError(s)
    }
}

impl From<String> for StoreError {
    fn from(s: String) -> StoreError { StoreError(s) }
}

/// Write a file containing nothing but the `header` row.
fn create_empty(path: &Path, header: &[&str]) -> Result<(), StoreError> {
    log::trace!("create_empty( {}, {:?} ) called.", path.display(), header);

    let mut w = csv::Writer::from_path(path)?;
    w.write_record(header)?;
    w.flush()?;
    Ok(())
}

/**
Read every data row of the table at `path`, parsing each with `parse`.

A missing file is created holding only `header` and yields an empty table.
Rows `parse` rejects are logged and skipped.
*/
fn read_table<T, F>(
    path: &Path,
    header: &[&str],
    parse: F,
) -> Result<Vec<T>, StoreError>
where
    F: Fn(&csv::StringRecord) -> Result<T, String>
{
    log::trace!("read_table( {} ) called.", path.display());

    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!(
                "{} doesn't exist; creating empty table.", path.display()
            );
            create_empty(path, header)
                .map_err(|e| e.annotate("Unable to create empty table"))?;
            return Ok(Vec::new());
        },
        Err(e) => {
            return Err(StoreError::from(e).annotate(
                &format!("Unable to open {}", path.display())
            ));
        },
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(f);

    let mut rows: Vec<T> = Vec::new();
    for res in csv_reader.records() {
        let record = res?;
        match parse(&record) {
            Ok(t) => { rows.push(t); },
            Err(e) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                log::warn!(
                    "Skipping line {} of {}: {}", line, path.display(), &e
                );
            },
        }
    }

    log::trace!(
        "read_table( {} ) returns {} rows.", path.display(), rows.len()
    );
    Ok(rows)
}

/// Replace the whole table at `path` with `header` followed by `rows`.
fn write_table<I, R>(
    path: &Path,
    header: &[&str],
    rows: I,
) -> Result<(), StoreError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    log::trace!("write_table( {} ) called.", path.display());

    let mut w = csv::Writer::from_path(path)?;
    w.write_record(header)?;
    for row in rows {
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

/// Ensure the file at `path` exists, creating it with only `header` if not.
fn ensure_table(path: &Path, header: &[&str]) -> Result<(), StoreError> {
    if path.exists() {
        Ok(())
    } else {
        log::info!("{} doesn't exist; creating.", path.display());
        create_empty(path, header)
    }
}

/// Both tables, as located by the configuration.
#[derive(Clone, Debug)]
pub struct Store {
    users: UserStore,
    marks: MarkStore,
}

impl Store {
    pub fn new(users_file: PathBuf, marks_file: PathBuf) -> Self {
        log::trace!(
            "Store::new( {}, {} ) called.",
            users_file.display(), marks_file.display()
        );

        Self {
            users: UserStore::new(users_file),
            marks: MarkStore::new(marks_file),
        }
    }

    pub fn users(&self) -> &UserStore { &self.users }

    pub fn marks(&self) -> &MarkStore { &self.marks }

    /// Make sure both backing files exist.
    pub fn ensure_files(&self) -> Result<(), StoreError> {
        log::trace!("Store::ensure_files() called.");

        self.users.ensure_file()
            .map_err(|e| e.annotate("User table"))?;
        self.marks.ensure_file()
            .map_err(|e| e.annotate("Marks table"))?;
        Ok(())
    }
}
