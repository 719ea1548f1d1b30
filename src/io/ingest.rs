//! CSV ingest for country-aggregated case counts.
//!
//! Expected columns (case-insensitive, any order, extras ignored):
//! `Date,Country,Confirmed,Recovered,Deaths`. Values are cumulative; empty
//! numeric fields count as 0.
//!
//! Steps:
//! - keep the rows for one country, in file order
//! - require consecutive calendar days
//! - drop the first `skip_days` rows, subtract `confirmed_offset`
//! - first-difference into daily increments (negative corrections clamp to 0)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use log::{debug, info, warn};

use crate::domain::{DataSource, ObservedSeries};
use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ingest output: the fit window plus the cumulative values it came from.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub country: String,
    /// One date per cumulative value.
    pub dates: Vec<NaiveDate>,
    pub confirmed_cumulative: Vec<f64>,
    pub deaths_cumulative: Vec<f64>,
    /// Daily increments, one fewer than `dates`.
    pub observed: ObservedSeries,
    /// Days whose negative difference was clamped to 0.
    pub clamped_days: usize,
    pub rows_read: usize,
}

impl IngestedData {
    /// Number of cumulative observed days.
    pub fn observed_days(&self) -> usize {
        self.dates.len()
    }
}

/// Load the observed series described by `source`.
pub fn load_observed(source: &DataSource) -> Result<IngestedData, AppError> {
    let file = File::open(&source.csv_path).map_err(|e| {
        AppError::io(format!(
            "Failed to open CSV '{}': {e}",
            source.csv_path.display()
        ))
    })?;
    read_observed(file, source)
}

/// Same as [`load_observed`] but from any reader (`source.csv_path` is ignored).
pub fn read_observed<R: Read>(input: R, source: &DataSource) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut confirmed = Vec::new();
    let mut deaths = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;
        let record = result.map_err(|e| AppError::data(format!("CSV parse error on line {line}: {e}")))?;

        if field(&record, columns.country) != source.country {
            continue;
        }
        let date = NaiveDate::parse_from_str(field(&record, columns.date), DATE_FORMAT)
            .map_err(|e| AppError::data(format!("Line {line}: invalid date: {e}")))?;
        if let Some(prev) = dates.last() {
            if prev.succ_opt() != Some(date) {
                return Err(AppError::data(format!(
                    "Line {line}: expected the day after {prev}, found {date}."
                )));
            }
        }
        dates.push(date);
        confirmed.push(parse_count(field(&record, columns.confirmed), "Confirmed", line)?);
        deaths.push(parse_count(field(&record, columns.deaths), "Deaths", line)?);
    }

    if dates.is_empty() {
        return Err(AppError::data(format!(
            "No rows found for country '{}'.",
            source.country
        )));
    }
    debug!(
        "Read {rows_read} rows, {} for '{}' ({} to {}).",
        dates.len(),
        source.country,
        dates[0],
        dates[dates.len() - 1]
    );

    if dates.len() < 2 || source.skip_days > dates.len() - 2 {
        return Err(AppError::data(format!(
            "Skipping {} of {} days leaves fewer than 2 observed days.",
            source.skip_days,
            dates.len()
        )));
    }
    let dates = dates.split_off(source.skip_days);
    let confirmed: Vec<f64> = confirmed[source.skip_days..]
        .iter()
        .map(|c| c - source.confirmed_offset)
        .collect();
    let deaths = deaths.split_off(source.skip_days);

    let (observed, clamped_days) = ObservedSeries::from_cumulative(&confirmed, &deaths)?;
    if clamped_days > 0 {
        warn!("Clamped {clamped_days} negative daily differences to 0 (data corrections).");
    }
    info!(
        "Fit window: {} to {} ({} daily increments).",
        dates[0],
        dates[dates.len() - 1],
        observed.len()
    );

    Ok(IngestedData {
        country: source.country.clone(),
        dates,
        confirmed_cumulative: confirmed,
        deaths_cumulative: deaths,
        observed,
        clamped_days,
        rows_read,
    })
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    country: usize,
    confirmed: usize,
    deaths: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        let find = |name: &str| {
            map.get(&name.to_ascii_lowercase())
                .copied()
                .ok_or_else(|| AppError::data(format!("CSV is missing required column '{name}'.")))
        };
        Ok(Self {
            date: find("Date")?,
            country: find("Country")?,
            confirmed: find("Confirmed")?,
            deaths: find("Deaths")?,
        })
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn parse_count(raw: &str, column: &str, line: usize) -> Result<f64, AppError> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::data(format!("Line {line}: invalid {column} value '{raw}'.")))?;
    if !value.is_finite() {
        return Err(AppError::data(format!("Line {line}: non-finite {column} value.")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const SAMPLE: &str = "\
Date,Country,Confirmed,Recovered,Deaths
2020-03-01,Germany,100,10,0
2020-03-01,France,50,1,2
2020-03-02,Germany,130,12,
2020-03-03,Germany,170,15,1
2020-03-04,Germany,165,20,3
2020-03-05,Germany,240,22,4
";

    fn source(skip_days: usize, offset: f64) -> DataSource {
        DataSource {
            csv_path: PathBuf::from("unused.csv"),
            country: "Germany".to_string(),
            skip_days,
            confirmed_offset: offset,
        }
    }

    #[test]
    fn filters_country_and_differences() {
        let data = read_observed(SAMPLE.as_bytes(), &source(0, 0.0)).unwrap();
        assert_eq!(data.rows_read, 6);
        assert_eq!(data.observed_days(), 5);
        assert_eq!(data.observed.confirmed_day_data(), &[30, 40, 0, 75]);
        assert_eq!(data.observed.dead_day_data(), &[0, 1, 2, 1]);
        assert_eq!(data.clamped_days, 1);
    }

    #[test]
    fn skip_and_offset_apply_to_cumulative_values() {
        let data = read_observed(SAMPLE.as_bytes(), &source(1, 16.0)).unwrap();
        assert_eq!(data.dates[0], NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());
        assert_eq!(data.confirmed_cumulative[0], 114.0);
        assert_eq!(data.deaths_cumulative, vec![0.0, 1.0, 3.0, 4.0]);
        // The offset cancels in the differences.
        assert_eq!(data.observed.confirmed_day_data(), &[40, 0, 75]);
    }

    #[test]
    fn skipping_too_much_is_a_data_error() {
        let err = read_observed(SAMPLE.as_bytes(), &source(4, 0.0)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }

    #[test]
    fn huge_skip_is_a_data_error_not_an_overflow() {
        let err = read_observed(SAMPLE.as_bytes(), &source(usize::MAX, 0.0)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }

    #[test]
    fn unknown_country_is_a_data_error() {
        let mut src = source(0, 0.0);
        src.country = "Atlantis".to_string();
        assert!(read_observed(SAMPLE.as_bytes(), &src).is_err());
    }

    #[test]
    fn gaps_in_dates_are_rejected() {
        let csv = "Date,Country,Confirmed,Recovered,Deaths\n\
                   2020-03-01,Germany,1,0,0\n\
                   2020-03-03,Germany,2,0,0\n";
        let err = read_observed(csv.as_bytes(), &source(0, 0.0)).unwrap_err();
        assert!(err.message().contains("2020-03-03"));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Date,Country,Confirmed\n2020-03-01,Germany,1\n";
        let err = read_observed(csv.as_bytes(), &source(0, 0.0)).unwrap_err();
        assert!(err.message().contains("Deaths"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let mut src = source(0, 0.0);
        src.csv_path = file.path().to_path_buf();
        let data = load_observed(&src).unwrap();
        assert_eq!(data.observed.len(), 4);

        src.csv_path = PathBuf::from("/nonexistent/cases.csv");
        assert_eq!(load_observed(&src).unwrap_err().kind(), crate::error::ErrorKind::Io);
    }
}
