//! Data sources feeding the table.
//!
//! `DataSource::load` is the only asynchronous boundary of the crate. It is
//! awaited once per controller. File sources read JSON arrays through
//! serde_json and tabular files (CSV, Parquet, Arrow IPC) through polars.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use polars::prelude::*;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::TableError;
use crate::record::Record;

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Record>, TableError>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Builds a source from a JSON value that must be an array of objects.
    pub fn from_json(value: Value) -> Result<Self, TableError> {
        Ok(Self::new(records_from_json(value)?))
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn load(&self) -> Result<Vec<Record>, TableError> {
        Ok(self.records.clone())
    }
}

/// A source that always fails, standing in for an unreachable backend.
#[derive(Debug, Clone)]
pub struct FailingSource {
    reason: String,
}

impl FailingSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DataSource for FailingSource {
    async fn load(&self) -> Result<Vec<Record>, TableError> {
        Err(TableError::DataLoad(self.reason.clone()))
    }
}

fn records_from_json(value: Value) -> Result<Vec<Record>, TableError> {
    let Value::Array(items) = value else {
        return Err(TableError::DataLoad(
            "Expected a JSON array of records".into(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(TableError::DataLoad(format!(
                "Record {idx} is not an object: {other}"
            ))),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Csv,
    Parquet,
    Arrow,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

impl FileInfo {
    pub fn inspect(path: PathBuf) -> Result<Self, TableError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TableError::FileNotFound,
            ErrorKind::PermissionDenied => TableError::PermissionDenied,
            _ => TableError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TableError::DataLoad("Not a file!".into()));
        }

        let file_type = detect_file_type(&path)?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, TableError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::Json),
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        _ => Err(TableError::UnknownFileType),
    }
}

/// A JSON file holding an array of objects.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<Record>, TableError> {
        let text = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&text)?;
        records_from_json(value)
    }
}

/// A CSV, Parquet or Arrow file read through polars.
#[derive(Debug, Clone)]
pub struct FrameFileSource {
    path: PathBuf,
    file_type: FileType,
}

impl FrameFileSource {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            file_type,
        }
    }

    fn scan(&self) -> Result<LazyFrame, TableError> {
        let frame = match self.file_type {
            FileType::Csv => load_csv(&self.path)?,
            FileType::Parquet => load_parquet(&self.path)?,
            FileType::Arrow => load_arrow(&self.path)?,
            FileType::Json => {
                return Err(TableError::DataLoad(
                    "JSON files are not read through polars".into(),
                ));
            }
        };
        Ok(frame)
    }
}

#[async_trait]
impl DataSource for FrameFileSource {
    async fn load(&self) -> Result<Vec<Record>, TableError> {
        let start_time = Instant::now();
        let df = self.scan()?.collect()?;

        // Each column is converted in its own thread.
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let columns: Result<Vec<Vec<Value>>, PolarsError> = names
            .par_iter()
            .map(|name| column_values(&df, name))
            .collect();
        let records = transpose(&names, columns?, df.height());

        info!(
            "Loading {} rows from {:?} took {}ms",
            records.len(),
            self.path,
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

/// Picks the source matching the file's extension.
#[derive(Debug, Clone)]
pub enum FileSource {
    Json(JsonFileSource),
    Frame(FrameFileSource),
}

impl FileSource {
    pub fn open(path: PathBuf) -> Result<Self, TableError> {
        let info = FileInfo::inspect(path)?;
        debug!(
            "Opening {:?} ({:?}, {} bytes)",
            info.path, info.file_type, info.file_size
        );
        Ok(match info.file_type {
            FileType::Json => FileSource::Json(JsonFileSource::new(info.path)),
            file_type => FileSource::Frame(FrameFileSource::new(info.path, file_type)),
        })
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn load(&self) -> Result<Vec<Record>, TableError> {
        match self {
            FileSource::Json(source) => source.load().await,
            FileSource::Frame(source) => source.load().await,
        }
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn is_integer_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn is_float_type(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Converts one column to JSON values, keeping numbers and booleans typed.
fn column_values(df: &DataFrame, col_name: &str) -> Result<Vec<Value>, PolarsError> {
    let column = df.column(col_name)?;
    let dtype = column.dtype().clone();

    let values = if is_integer_type(&dtype) {
        let col = column.cast(&DataType::Int64)?;
        let series = col.i64()?;
        series.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect()
    } else if is_float_type(&dtype) {
        let col = column.cast(&DataType::Float64)?;
        let series = col.f64()?;
        series.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect()
    } else if dtype == DataType::Boolean {
        let series = column.bool()?;
        series.into_iter().map(|v| v.map_or(Value::Null, Value::Bool)).collect()
    } else {
        let col = column.cast(&DataType::String)?;
        let series = col.str()?;
        series
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect()
    };
    Ok(values)
}

fn transpose(names: &[String], columns: Vec<Vec<Value>>, height: usize) -> Vec<Record> {
    let mut cells: Vec<_> = columns.into_iter().map(|c| c.into_iter()).collect();
    (0..height)
        .map(|_| {
            names
                .iter()
                .zip(cells.iter_mut())
                .map(|(name, column)| (name.clone(), column.next().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn memory_source_requires_objects() {
        let source = MemorySource::from_json(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(block_on(source.load()).unwrap().len(), 2);
        assert!(matches!(
            MemorySource::from_json(json!({"a": 1})),
            Err(TableError::DataLoad(_))
        ));
        assert!(matches!(
            MemorySource::from_json(json!([{"a": 1}, 3])),
            Err(TableError::DataLoad(_))
        ));
    }

    #[test]
    fn failing_source_fails() {
        let source = FailingSource::new("offline");
        assert!(matches!(
            block_on(source.load()),
            Err(TableError::DataLoad(reason)) if reason == "offline"
        ));
    }

    #[test]
    fn detects_file_types() {
        assert_eq!(detect_file_type(Path::new("a.json")).unwrap(), FileType::Json);
        assert_eq!(detect_file_type(Path::new("a.CSV")).unwrap(), FileType::Csv);
        assert_eq!(detect_file_type(Path::new("a.pq")).unwrap(), FileType::Parquet);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::Arrow);
        assert!(matches!(
            detect_file_type(Path::new("a.txt")),
            Err(TableError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileSource::open(dir.path().join("nope.json")),
            Err(TableError::FileNotFound)
        ));
        assert!(matches!(
            FileSource::open(dir.path().to_path_buf()),
            Err(TableError::DataLoad(_))
        ));
    }

    #[test]
    fn json_file_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"[{{"type": "A", "name": "x", "n": 1}}]"#).unwrap();

        let source = FileSource::open(path).unwrap();
        let records = block_on(source.load()).unwrap();
        assert_eq!(records[0].keys().collect::<Vec<_>>(), ["type", "name", "n"]);
        assert_eq!(records[0]["n"], json!(1));
    }

    #[test]
    fn invalid_json_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "not json").unwrap();
        let err = block_on(JsonFileSource::new(path).load()).unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn csv_columns_keep_their_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "type,name,n,score\nA,x,1,0.5\nB,y,2,1.5\n").unwrap();

        let source = FileSource::open(path).unwrap();
        let records = block_on(source.load()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keys().collect::<Vec<_>>(), ["type", "name", "n", "score"]);
        assert_eq!(records[1]["name"], json!("y"));
        assert_eq!(records[1]["n"], json!(2));
        assert_eq!(records[0]["score"], json!(0.5));
    }

    #[test]
    fn transpose_builds_records_row_by_row() {
        let names = vec!["a".to_string(), "b".to_string()];
        let records = transpose(
            &names,
            vec![vec![json!(1), json!(2)], vec![json!("x"), Value::Null]],
            2,
        );
        assert_eq!(records[0]["a"], json!(1));
        assert_eq!(records[0]["b"], json!("x"));
        assert_eq!(records[1]["b"], Value::Null);
    }
}
