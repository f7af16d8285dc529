// Primitives for reading the CSV files of the three categories.

use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::gap::{io_common::simplify_file_name, *};

const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Parses a day-first date. ISO dates are accepted as well.
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

// Positions of the columns in the file.
struct CsvColumns {
    date: usize,
    state: usize,
    district: Option<usize>,
    pincode: usize,
    metrics: Vec<(usize, &'static str)>,
}

fn column_index(headers: &StringRecord, name: &str, path: &str) -> GapResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .context(CsvMissingColumnSnafu { column: name, path })
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord, category: Category, path: &str) -> GapResult<CsvColumns> {
        let mut metrics = Vec::new();
        for name in category.metric_columns() {
            metrics.push((column_index(headers, name, path)?, *name));
        }
        Ok(CsvColumns {
            date: column_index(headers, "date", path)?,
            state: column_index(headers, "state", path)?,
            district: headers.iter().position(|h| h == "district"),
            pincode: column_index(headers, "pincode", path)?,
            metrics,
        })
    }

    fn read_record(&self, line: &StringRecord, path: &str, lineno: usize) -> GapResult<RawRecord> {
        let cell = |idx: usize| line.get(idx).unwrap_or("");
        let non_empty = |idx: usize| Some(cell(idx)).filter(|s| !s.is_empty()).map(|s| s.to_string());

        let date_s = cell(self.date);
        let date = parse_day_first_date(date_s).context(DateParseSnafu {
            value: date_s,
            path,
            lineno,
        })?;
        let pincode = non_empty(self.pincode).context(MissingPincodeSnafu { path, lineno })?;

        let mut metrics: Vec<u64> = Vec::with_capacity(self.metrics.len());
        for (idx, name) in self.metrics.iter() {
            let value = cell(*idx);
            let x = value.parse::<u64>().context(MetricParseSnafu {
                value,
                column: *name,
                path,
                lineno,
            })?;
            metrics.push(x);
        }

        Ok(RawRecord {
            state: non_empty(self.state),
            district: self.district.and_then(non_empty),
            pincode,
            date,
            metrics,
        })
    }
}

/// Reads all the records of a CSV file of the given category.
///
/// Columns are found by their header. The `district` column is optional.
pub fn read_category_csv(path: &Path, category: Category) -> GapResult<Vec<RawRecord>> {
    let path_s = path.display().to_string();
    info!(
        "read_category_csv: reading {} file {:?}",
        category,
        simplify_file_name(path)
    );
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path: &path_s })?;
    let headers = rdr
        .headers()
        .context(CsvOpenSnafu { path: &path_s })?
        .clone();
    let columns = CsvColumns::from_headers(&headers, category, &path_s)?;

    let mut res: Vec<RawRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is on the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {
            path: &path_s,
            lineno,
        })?;
        debug!("read_category_csv: {:?} {:?}", lineno, line);
        res.push(columns.read_record(&line, &path_s, lineno)?);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_path(lpath: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data")
            .join(lpath)
    }

    #[test]
    fn dates() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_day_first_date("01-03-2025"), Some(d));
        assert_eq!(parse_day_first_date("01/03/2025"), Some(d));
        assert_eq!(parse_day_first_date("01.03.2025"), Some(d));
        assert_eq!(parse_day_first_date("2025-03-01"), Some(d));
        assert_eq!(parse_day_first_date("31-02-2025"), None);
        assert_eq!(parse_day_first_date("March 1st"), None);
        assert_eq!(parse_day_first_date(""), None);
    }

    #[test]
    fn enrolment_file() {
        let records = read_category_csv(
            &data_path("small/api_data_aadhar_enrolment/enrolment_part_1.csv"),
            Category::Enrolment,
        )
        .unwrap();
        assert_eq!(records.len(), 4);
        let r = &records[0];
        assert_eq!(r.state.as_deref(), Some("Karnataka"));
        assert_eq!(r.district.as_deref(), Some("Bengaluru"));
        assert_eq!(r.pincode, "560001");
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(r.metrics, vec![40, 50, 10]);
    }

    #[test]
    fn empty_cells_are_absent() {
        let records = read_category_csv(
            &data_path("bad/empty_state.csv"),
            Category::Biometric,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, None);
        assert_eq!(records[0].district, None);
    }

    #[test]
    fn missing_column() {
        let res = read_category_csv(
            &data_path("bad/missing_column.csv"),
            Category::Demographic,
        );
        match res {
            Err(GapError::CsvMissingColumn { column, .. }) => assert_eq!(column, "demo_age_17_"),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn bad_date() {
        let res = read_category_csv(&data_path("bad/bad_date.csv"), Category::Biometric);
        match res {
            Err(GapError::DateParse { value, lineno, .. }) => {
                assert_eq!(value, "2025/13/45");
                assert_eq!(lineno, 3);
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn bad_metric() {
        let res = read_category_csv(&data_path("bad/bad_metric.csv"), Category::Biometric);
        assert!(matches!(res, Err(GapError::MetricParse { .. })));
    }

    #[test]
    fn missing_pincode() {
        let res = read_category_csv(&data_path("bad/missing_pincode.csv"), Category::Biometric);
        assert!(matches!(res, Err(GapError::MissingPincode { lineno: 2, .. })));
    }
}
