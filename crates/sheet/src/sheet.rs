use anyhow::{Context, Result, ensure};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use survey_core::FlatRecord;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Spreadsheet applications need the byte-order mark to read Arabic names
/// in a CSV as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct SheetPaths {
    pub dir: PathBuf,
}

impl SheetPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating export directory {}", self.dir.display()))?;
        Ok(())
    }

    pub fn sheet_path(&self, title: &str, date: Date) -> Result<PathBuf> {
        Ok(self.dir.join(sheet_file_name(title, date)?))
    }
}

/// `<title>_<YYYY-MM-DD>.csv`, with characters unsafe in file names
/// replaced by `_`.
pub fn sheet_file_name(title: &str, date: Date) -> Result<String> {
    let day = date.format(format_description!("[year]-[month]-[day]"))?;
    let safe: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    Ok(format!("{safe}_{day}.csv"))
}

/// Write the records to today's sheet in `out_dir` and return its path.
pub fn write_sheet(records: &[FlatRecord], title: &str, out_dir: &Path) -> Result<PathBuf> {
    write_sheet_dated(records, title, out_dir, OffsetDateTime::now_utc().date())
}

pub fn write_sheet_dated(
    records: &[FlatRecord],
    title: &str,
    out_dir: &Path,
    date: Date,
) -> Result<PathBuf> {
    ensure!(!records.is_empty(), "refusing to write an empty sheet");

    let paths = SheetPaths::new(out_dir);
    paths.ensure()?;
    let target = paths.sheet_path(title, date)?;

    // 1) Write everything to a temp file next to the target
    let temp = target.with_extension("csv.tmp");
    let mut file =
        File::create(&temp).with_context(|| format!("creating {}", temp.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing {}: {}", temp.display(), e.error()))?;
    file.sync_all()?;

    // 2) Swap it into place so readers never see a half-written sheet
    fs::rename(&temp, &target)
        .with_context(|| format!("moving sheet into place at {}", target.display()))?;

    tracing::info!(path = %target.display(), rows = records.len(), "sheet written");
    Ok(target)
}
