//! Split stage: one CSV per calendar year.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crime_risk_crime_models::MonthStamp;
use crime_risk_ingest_models::{PipelineConfig, SplitReport, YearFile};

use crate::IngestError;
use crate::table;

/// An open per-year output file.
struct YearWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

/// Path of the file holding `year`'s rows.
#[must_use]
pub fn year_file_path(output_dir: &Path, prefix: &str, year: i32) -> PathBuf {
    output_dir.join(format!("{prefix}_{year}.csv"))
}

/// Splits the rows of `input` into `<output_dir>/<prefix>_<year>.csv`.
///
/// Each file gets the (trimmed) header row once, followed by that year's
/// rows in input order. Existing files for a year are replaced. Rows whose
/// month cannot be parsed are skipped.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the month column is
/// missing, or an output file cannot be created or written.
pub fn split_by_year<R: Read>(
    input: R,
    output_dir: &Path,
    prefix: &str,
    config: &PipelineConfig,
) -> Result<SplitReport, IngestError> {
    let start = Instant::now();

    let mut reader = table::reader(input);
    let headers = table::trimmed_headers(&mut reader)?;
    let month_idx = table::column_index(&headers, &config.columns.month)?;

    std::fs::create_dir_all(output_dir)?;

    let mut writers: BTreeMap<i32, YearWriter> = BTreeMap::new();
    let mut report = SplitReport::default();

    for record in reader.records() {
        let row = record?;
        report.loaded += 1;

        let Some(month) = row.get(month_idx).and_then(MonthStamp::parse) else {
            report.skipped += 1;
            continue;
        };

        let year = month.year();
        let entry = match writers.entry(year) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => {
                let path = year_file_path(output_dir, prefix, year);
                log::debug!("Creating {}", path.display());
                let mut writer = csv::Writer::from_path(&path)?;
                writer.write_record(&headers)?;
                e.insert(YearWriter {
                    path,
                    writer,
                    rows: 0,
                })
            }
        };
        entry.writer.write_record(&row)?;
        entry.rows += 1;

        if report.loaded % 500_000 == 0 {
            log::info!("Processed {} rows...", report.loaded);
        }
    }

    for (year, mut year_writer) in writers {
        year_writer.writer.flush()?;
        drop(year_writer.writer);
        let bytes = std::fs::metadata(&year_writer.path)?.len();
        report.files.push(YearFile {
            year,
            path: year_writer.path,
            rows: year_writer.rows,
            bytes,
        });
    }

    report.duration = start.elapsed();

    let mut total_bytes = 0;
    for file in &report.files {
        total_bytes += file.bytes;
        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = file.bytes as f64 / (1024.0 * 1024.0);
        log::info!("  {}: {mb:.2} MB, {} records", file.path.display(), file.rows);
    }
    #[allow(clippy::cast_precision_loss)]
    let total_mb = total_bytes as f64 / (1024.0 * 1024.0);
    log::info!(
        "Split {} rows into {} files ({total_mb:.2} MB) in {:.2}s; {} rows skipped",
        report.loaded - report.skipped,
        report.files.len(),
        report.duration.as_secs_f64(),
        report.skipped,
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crime_risk_split_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_one_file_per_year_with_header() {
        let input = "\
Month,Latitude,Longitude
2020-11,51.5,-0.1
2021-01,51.6,-0.2
2020-12,51.7,-0.3
nope,51.8,-0.4
";
        let dir = scratch_dir("years");
        let report =
            split_by_year(input.as_bytes(), &dir, "burglaries", &PipelineConfig::default())
                .unwrap();

        assert_eq!(report.loaded, 4);
        assert_eq!(report.skipped, 1);
        let years: Vec<(i32, u64)> = report.files.iter().map(|f| (f.year, f.rows)).collect();
        assert_eq!(years, vec![(2020, 2), (2021, 1)]);

        let y2020 = std::fs::read_to_string(year_file_path(&dir, "burglaries", 2020)).unwrap();
        assert_eq!(
            y2020,
            "Month,Latitude,Longitude\n2020-11,51.5,-0.1\n2020-12,51.7,-0.3\n"
        );
        assert_eq!(report.files[0].bytes, y2020.len() as u64);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
