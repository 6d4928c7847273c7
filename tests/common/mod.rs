#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use digital_divide::frame::{Column, Table};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A region column followed by one numeric indicator.
pub fn indicator_table(indicator: &str, values: &[Option<f64>]) -> Table {
    let regions = (0..values.len())
        .map(|idx| Some(format!("region-{idx}")))
        .collect();
    Table::from_columns(vec![
        Column::text("region", regions),
        Column::numeric(indicator, values.to_vec()),
    ])
    .expect("aligned columns")
}

pub fn text_values(table: &Table, column: &str) -> Vec<String> {
    let column = table.column(column).expect("column present");
    (0..column.len())
        .map(|row| column.get(row).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}
