use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    /// Value written into a cell that is missing from the file.
    #[must_use]
    pub fn zero_value(self) -> &'static str {
        match self {
            Self::Integer | Self::Real => "0",
            Self::Text => "",
        }
    }

    /// Clean up a raw cell before deserialization. Blank numeric cells become
    /// zero and integral floats such as `10000.0` become `10000`.
    fn normalize(self, raw: &str) -> Cow<'_, str> {
        if self == Self::Text {
            return Cow::Borrowed(raw);
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cow::Borrowed(self.zero_value());
        }
        if self == Self::Integer && trimmed.parse::<i64>().is_err() {
            if let Ok(v) = trimmed.parse::<f64>() {
                if v.is_finite() && v.fract() == 0.0 {
                    return Cow::Owned((v as i64).to_string());
                }
            }
        }
        Cow::Borrowed(trimmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// Persisted layout of the daily record table. New columns go at the end.
pub const SCHEMA: &[Column] = &[
    col("User_ID", ColumnKind::Text),
    col("Date", ColumnKind::Text),
    col("User_Name", ColumnKind::Text),
    col("User_Age", ColumnKind::Integer),
    col("User_Gender", ColumnKind::Text),
    col("User_Height", ColumnKind::Real),
    col("User_Target_W", ColumnKind::Real),
    col("Target_Steps", ColumnKind::Integer),
    col("Target_Sleep", ColumnKind::Real),
    col("Target_Water", ColumnKind::Real),
    col("Target_Calories", ColumnKind::Integer),
    col("Weight", ColumnKind::Real),
    col("Steps", ColumnKind::Integer),
    col("Sleep_H", ColumnKind::Integer),
    col("Sleep_M", ColumnKind::Integer),
    col("Calories", ColumnKind::Integer),
    col("Protein", ColumnKind::Real),
    col("Carbs", ColumnKind::Real),
    col("Fats", ColumnKind::Real),
    col("Fiber", ColumnKind::Real),
    col("Tea_Cups", ColumnKind::Integer),
    col("Toilet_Visits", ColumnKind::Integer),
    col("Workout", ColumnKind::Text),
    col("Supplements", ColumnKind::Text),
    col("Fasting_Ratio", ColumnKind::Text),
    col("Daily_Notes", ColumnKind::Text),
    col("Mood", ColumnKind::Text),
];

/// The daily record table on disk. Every save rewrites the whole file.
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored row.
    ///
    /// A missing file yields an empty table. So does an unreadable or malformed
    /// one: the failure is logged and never returned.
    #[must_use]
    pub fn load_all(&self, schema: &[Column]) -> Table {
        match read_rows(&self.path, schema) {
            Ok(Some(rows)) => {
                debug!("loaded {} rows from {}", rows.len(), self.path.display());
                Table::from_rows(schema, rows)
            }
            Ok(None) => {
                debug!("{} does not exist, starting empty", self.path.display());
                Table::empty(schema)
            }
            Err(err) => {
                warn!(
                    "ignoring unreadable record file {}: {err:#}",
                    self.path.display()
                );
                self.back_up_unreadable();
                Table::empty(schema)
            }
        }
    }

    /// Keep a copy of a file that failed to load, since the next save
    /// replaces it.
    fn back_up_unreadable(&self) {
        let backup = sibling_path(&self.path, ".bak");
        match fs::copy(&self.path, &backup) {
            Ok(_) => warn!("saved a copy of it as {}", backup.display()),
            Err(e) => warn!("could not copy it to {}: {e}", backup.display()),
        }
    }

    /// Overwrite the stored table with `table`.
    ///
    /// The header is always the full [`SCHEMA`], since every row serializes
    /// every record field.
    pub fn save_all(&self, table: &Table) -> Result<()> {
        let columns: Vec<&str> = SCHEMA.iter().map(|c| c.name).collect();
        write_rows(&self.path, &columns, table.rows())?;
        debug!("saved {} rows to {}", table.len(), self.path.display());
        Ok(())
    }
}

/// Read `path` as CSV into rows of `T`, completing missing columns from
/// `schema`. `Ok(None)` means the file does not exist.
pub(crate) fn read_rows<T: DeserializeOwned>(
    path: &Path,
    schema: &[Column],
) -> Result<Option<Vec<T>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open {}", path.display())),
    };
    parse_rows(file, schema).map(Some)
}

pub(crate) fn parse_rows<T: DeserializeOwned, R: Read>(
    reader: R,
    schema: &[Column],
) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let positions: Vec<Option<usize>> = schema
        .iter()
        .map(|c| headers.iter().position(|h| h.trim() == c.name))
        .collect();
    let schema_headers: csv::StringRecord = schema.iter().map(|c| c.name).collect();

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let completed: csv::StringRecord = schema
            .iter()
            .zip(&positions)
            .map(|(column, pos)| {
                let raw = pos.and_then(|i| record.get(i)).unwrap_or("");
                column.kind.normalize(raw)
            })
            .collect();
        let row = completed
            .deserialize(Some(&schema_headers))
            .with_context(|| format!("Invalid value in CSV row {}", line_num + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Replace `path` with a CSV of `rows` under the header `columns`.
///
/// The data is written to a sibling temp file first and renamed into place.
pub(crate) fn write_rows<T: Serialize, C: AsRef<str>>(
    path: &Path,
    columns: &[C],
    rows: &[T],
) -> Result<()> {
    let tmp = sibling_path(path, ".tmp");
    if let Err(source) = write_csv(&tmp, columns, rows).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::Io {
            path: path.to_path_buf(),
            source,
        }
        .into());
    }
    Ok(())
}

fn write_csv<T: Serialize, C: AsRef<str>>(path: &Path, columns: &[C], rows: &[T]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(columns.iter().map(AsRef::as_ref))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    let file = wtr.into_inner().map_err(csv::IntoInnerError::into_error)?;
    file.sync_all()
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}
