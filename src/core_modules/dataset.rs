// THEORY:
// The `Dataset` is the training set that the whole engine exists to produce: an
// append-only, ordered list of labeled `GestureFeatures`. It is an ordinary
// owned value. Whoever does the labeling holds it, loads it explicitly at start
// and saves it explicitly when asked.
//
// On disk it is a flat comma-separated table: one header line, then 19 values
// per record (8 scalars, 10 histogram slices, the label code). Floats are
// written with Rust's shortest round-trip formatting, so a save followed by a
// load reproduces every field exactly.
//
// Failure policy:
// - `load` never fails. A missing file is an empty dataset; an unreadable file
//   or a foreign header is logged and also yields an empty dataset; individual
//   malformed rows are logged and skipped while the rest load normally.
// - `save` writes to a sibling temporary file and renames it over the target,
//   so an error at any step leaves the previous file as it was.

use crate::core_modules::gesture::{GestureFeatures, GestureLabel, RADIAL_SLICES};
use crate::error::DatasetError;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Names of the scalar columns, in file order.
pub const SCALAR_COLUMNS: [&str; 8] = [
    "AreaCB",
    "AreaCH",
    "PerimeterCH",
    "MaxD",
    "MinD",
    "AverageD",
    "PointsCH",
    "AverageA",
];

const LABEL_COLUMN: &str = "class";
const COLUMN_COUNT: usize = SCALAR_COLUMNS.len() + RADIAL_SLICES + 1;

/// Every column name in file order.
pub fn header_columns() -> Vec<String> {
    SCALAR_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain((0..RADIAL_SLICES).map(|i| format!("slice{i}")))
        .chain(std::iter::once(LABEL_COLUMN.to_string()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<GestureFeatures>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[GestureFeatures] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureFeatures> {
        self.records.iter()
    }

    pub fn push(&mut self, record: GestureFeatures) {
        self.records.push(record);
    }

    /// Appends in order. No deduplication.
    pub fn append(&mut self, records: impl IntoIterator<Item = GestureFeatures>) {
        self.records.extend(records);
    }

    /// Number of records per label, every label present (zero counts included).
    pub fn label_counts(&self) -> BTreeMap<GestureLabel, usize> {
        let mut counts: BTreeMap<GestureLabel, usize> =
            GestureLabel::ALL.into_iter().map(|label| (label, 0)).collect();
        for record in &self.records {
            *counts.entry(record.label).or_insert(0) += 1;
        }
        counts
    }

    /// Reads the dataset at `path`, treating every failure as "no data yet".
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no dataset on disk, starting empty");
                return Self::new();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not open dataset, starting empty");
                return Self::new();
            }
        };

        match Self::read_from(BufReader::new(file)) {
            Ok(dataset) => {
                info!(path = %path.display(), records = dataset.len(), "loaded gesture dataset");
                dataset
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read dataset, starting empty");
                Self::new()
            }
        }
    }

    /// Parses a header line and records from `reader`. Malformed rows are skipped.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, DatasetError> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Ok(Self::new()),
        };
        check_header(&header)?;

        let mut dataset = Self::new();
        for (index, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok(record) => dataset.push(record),
                // Line numbers are 1-based and the header is line 1.
                Err(reason) => warn!(line = index + 2, %reason, "skipping malformed dataset row"),
            }
        }
        Ok(dataset)
    }

    /// Writes the header and every record, one `\n`-terminated line each.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "{}", header_columns().join(","))?;
        for record in &self.records {
            writeln!(writer, "{}", format_record(record))?;
        }
        writer.flush()
    }

    /// Overwrites `path` with the current contents.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let staging = staging_path(path);

        let result = File::create(&staging)
            .and_then(|file| self.write_to(BufWriter::new(file)))
            .map_err(|source| DatasetError::Io { path: staging.clone(), source })
            .and_then(|()| {
                fs::rename(&staging, path)
                    .map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })
            });

        match &result {
            Ok(()) => info!(path = %path.display(), records = self.len(), "saved gesture dataset"),
            Err(err) => {
                // The staging file may not exist at all; nothing to report if so.
                let _ = fs::remove_file(&staging);
                warn!(error = %err, "failed to save gesture dataset");
            }
        }
        result
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a GestureFeatures;
    type IntoIter = std::slice::Iter<'a, GestureFeatures>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

fn check_header(line: &str) -> Result<(), DatasetError> {
    let found: Vec<&str> = line
        .trim_start_matches('\u{feff}')
        .trim_end()
        .split(',')
        .map(str::trim)
        .collect();
    let expected = header_columns();
    if found.len() == expected.len() && found.iter().zip(&expected).all(|(f, e)| f == e) {
        Ok(())
    } else {
        Err(DatasetError::Header { found: line.to_string() })
    }
}

fn format_record(record: &GestureFeatures) -> String {
    let scalars = [
        record.area_ratio_to_box,
        record.area_ratio_to_hull,
        record.perimeter_ratio_to_hull,
        record.max_radial_distance,
        record.min_radial_distance,
        record.average_radial_distance,
        record.point_count_ratio_to_hull,
        record.average_angle,
    ];
    scalars
        .iter()
        .map(|value| value.to_string())
        .chain(record.radial_histogram.iter().map(|count| count.to_string()))
        .chain(std::iter::once(record.label.code().to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_record(line: &str) -> Result<GestureFeatures, String> {
    let fields: Vec<&str> = line.trim_end().split(',').map(str::trim).collect();
    if fields.len() != COLUMN_COUNT {
        return Err(format!("expected {COLUMN_COUNT} columns, found {}", fields.len()));
    }

    let mut scalars = [0f64; SCALAR_COLUMNS.len()];
    for (i, (slot, field)) in scalars.iter_mut().zip(&fields).enumerate() {
        *slot = field
            .parse()
            .map_err(|_| format!("{} is not a number: {field:?}", SCALAR_COLUMNS[i]))?;
    }

    let mut radial_histogram = [0u32; RADIAL_SLICES];
    for (i, (slot, field)) in radial_histogram
        .iter_mut()
        .zip(&fields[SCALAR_COLUMNS.len()..])
        .enumerate()
    {
        *slot = field
            .parse()
            .map_err(|_| format!("slice{i} is not a count: {field:?}"))?;
    }

    let label_field = fields[COLUMN_COUNT - 1];
    let label = label_field
        .parse::<i64>()
        .map_err(|_| format!("class is not an integer: {label_field:?}"))
        .and_then(|code| GestureLabel::try_from(code).map_err(|err| err.to_string()))?;

    let [
        area_ratio_to_box,
        area_ratio_to_hull,
        perimeter_ratio_to_hull,
        max_radial_distance,
        min_radial_distance,
        average_radial_distance,
        point_count_ratio_to_hull,
        average_angle,
    ] = scalars;

    Ok(GestureFeatures {
        area_ratio_to_box,
        area_ratio_to_hull,
        perimeter_ratio_to_hull,
        max_radial_distance,
        min_radial_distance,
        average_radial_distance,
        point_count_ratio_to_hull,
        average_angle,
        radial_histogram,
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use tempfile::tempdir;

    fn record(seed: u32, label: GestureLabel) -> GestureFeatures {
        let s = seed as f64;
        let mut radial_histogram = [0u32; RADIAL_SLICES];
        for (i, slot) in radial_histogram.iter_mut().enumerate() {
            *slot = seed * 3 + i as u32;
        }
        GestureFeatures {
            area_ratio_to_box: 0.1 + s / 7.0,
            area_ratio_to_hull: 1.0 / 3.0,
            perimeter_ratio_to_hull: 1.0 + s * 1e-9,
            max_radial_distance: 42.123456789 + s,
            min_radial_distance: 2f64.sqrt(),
            average_radial_distance: 17.0,
            point_count_ratio_to_hull: 0.0123,
            average_angle: -PI + 1e-3 * s,
            radial_histogram,
            label,
        }
    }

    #[test]
    fn header_matches_file_format() {
        assert_eq!(
            header_columns().join(","),
            "AreaCB,AreaCH,PerimeterCH,MaxD,MinD,AverageD,PointsCH,AverageA,\
             slice0,slice1,slice2,slice3,slice4,slice5,slice6,slice7,slice8,slice9,class"
        );
    }

    #[test]
    fn written_rows_have_nineteen_values() {
        let mut dataset = Dataset::new();
        dataset.push(record(1, GestureLabel::Rock));
        let mut buffer = Vec::new();
        dataset.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].split(',').count(), 19);
        assert!(lines[1].ends_with(",4"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn save_then_load_round_trips_exactly() {
        let dir = tempdir().unwrap();
        for size in [0usize, 1, 25] {
            let path = dir.path().join(format!("gestures_{size}.csv"));
            let mut dataset = Dataset::new();
            dataset.append((0..size).map(|i| {
                record(i as u32, GestureLabel::ALL[i % GestureLabel::ALL.len()])
            }));
            dataset.save(&path).unwrap();
            let loaded = Dataset::load(&path);
            assert_eq!(loaded, dataset);
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        assert!(Dataset::load(dir.path().join("absent.csv")).is_empty());
    }

    #[test]
    fn foreign_header_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "Width,Height,Label\n1,2,0\n").unwrap();
        assert!(Dataset::load(&path).is_empty());
        assert!(matches!(
            Dataset::read_from("a,b\n".as_bytes()),
            Err(DatasetError::Header { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut good = Vec::new();
        let mut dataset = Dataset::new();
        dataset.push(record(2, GestureLabel::Peace));
        dataset.write_to(&mut good).unwrap();
        let mut text = String::from_utf8(good).unwrap();
        text.push_str("1,2,3\n");
        text.push_str("x,1,1,1,1,1,1,1,0,0,0,0,0,0,0,0,0,0,1\n");
        text.push_str("1,1,1,1,1,1,1,1,0,0,0,0,0,0,0,0,0,0,9\n");
        text.push_str("\n");
        text.push_str("1,1,1,1,1,1,1,1,0,0,0,0,0,0,0,0,0,0,2\r\n");

        let loaded = Dataset::read_from(text.as_bytes()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records()[0], record(2, GestureLabel::Peace));
        assert_eq!(loaded.records()[1].label, GestureLabel::Ok);
    }

    #[test]
    fn empty_stream_is_empty_dataset() {
        assert!(Dataset::read_from("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn failed_save_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gestures.csv");
        fs::write(&path, "previous contents\n").unwrap();
        fs::create_dir(dir.path().join("gestures.csv.tmp")).unwrap();

        let mut dataset = Dataset::new();
        dataset.push(record(0, GestureLabel::HighFive));
        assert!(dataset.save(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous contents\n");
    }

    #[test]
    fn save_into_missing_directory_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("gestures.csv");
        let err = Dataset::new().save(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn label_counts_cover_every_label() {
        let mut dataset = Dataset::new();
        dataset.append([
            record(0, GestureLabel::Peace),
            record(1, GestureLabel::Peace),
            record(2, GestureLabel::None),
        ]);
        let counts = dataset.label_counts();
        assert_eq!(counts.len(), GestureLabel::ALL.len());
        assert_eq!(counts[&GestureLabel::Peace], 2);
        assert_eq!(counts[&GestureLabel::None], 1);
        assert_eq!(counts[&GestureLabel::Judgement], 0);
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut dataset = Dataset::new();
        dataset.append([record(5, GestureLabel::Rock), record(1, GestureLabel::Ok)]);
        dataset.append([record(5, GestureLabel::Rock)]);
        let labels: Vec<GestureLabel> = dataset.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![GestureLabel::Rock, GestureLabel::Ok, GestureLabel::Rock]);
    }
}
