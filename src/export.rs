use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppError, Result};
use crate::reshape::DisplayTable;
use crate::types::SearchParameters;

/// `recommendations_{origin}_{destination}_{start}_{end}.csv`
pub fn export_file_name(params: &SearchParameters) -> String {
    format!(
        "recommendations_{}_{}_{}_{}.csv",
        params.origin, params.destination, params.start_date, params.end_date
    )
}

/// Header of column labels, then one record per view row.
pub fn write_csv<W: Write>(table: &DisplayTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.columns().iter().map(|c| c.label()))?;
    for record in table.cells() {
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn to_csv_bytes(table: &DisplayTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

/// Write the view into `dir` under its export name. Returns the file written.
pub fn export_to_dir(table: &DisplayTable, params: &SearchParameters, dir: &Path) -> Result<PathBuf> {
    if table.is_empty() {
        return Err(AppError::InvalidParameter("nothing to export".to_string()));
    }
    let path = dir.join(export_file_name(params));
    let file = std::fs::File::create(&path)?;
    write_csv(table, std::io::BufWriter::new(file))?;
    info!(path = %path.display(), rows = table.len(), "view exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataCoverage;
    use crate::types::{FlightLeg, MilesField, RouteRow, RouteType};

    fn sample() -> DisplayTable {
        let legs = vec![
            FlightLeg {
                airline: Some("AA".into()),
                flight_number: Some("1".into()),
                departure_time: Some("2025-08-10T06:00".into()),
                arrival_time: Some("2025-08-10T10:00".into()),
            },
            FlightLeg {
                airline: Some("AA".into()),
                flight_number: Some("2".into()),
                departure_time: Some("2025-08-10T11:15".into()),
                arrival_time: Some("2025-08-10T15:00".into()),
            },
        ];
        DisplayTable::reshape(&vec![
            RouteRow {
                date: Some("2025-08-10".into()),
                route_type: Some(RouteType::Synthetic),
                airline: Some("American Airlines, Inc.".into()),
                price: Some(380.0),
                taxes: Some(11.2),
                miles: Some(MilesField::Number(20000.0)),
                value_per_mile_cents: Some(1.84),
                flights_json: Some(legs),
                route: Some("LAX → ORD → JFK".into()),
                ..RouteRow::default()
            },
            RouteRow {
                date: Some("2025-08-11".into()),
                route_type: Some(RouteType::Direct),
                airline: Some("Delta".into()),
                price: Some(450.0),
                ..RouteRow::default()
            },
        ])
    }

    #[test]
    fn csv_round_trips_rows_and_columns() {
        let table = sample();
        let bytes = to_csv_bytes(&table).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let expected: Vec<String> = table.columns().iter().map(|c| c.label().to_string()).collect();
        assert_eq!(headers, expected);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), table.len());
        assert_eq!(&records[0][2], "American Airlines, Inc.");
        let layover = headers.iter().position(|h| h == "Layover (min)").unwrap();
        assert_eq!(&records[0][layover], "75");
        assert_eq!(&records[1][layover], "");
    }

    #[test]
    fn file_name_uses_route_and_dates() {
        let params = SearchParameters::defaults(&DataCoverage::august_2025());
        assert_eq!(
            export_file_name(&params),
            "recommendations_LAX_JFK_2025-08-15_2025-08-15.csv"
        );
    }

    #[test]
    fn export_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let params = SearchParameters::defaults(&DataCoverage::august_2025());
        let path = export_to_dir(&sample(), &params, dir.path()).unwrap();
        assert!(path.ends_with("recommendations_LAX_JFK_2025-08-15_2025-08-15.csv"));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn empty_view_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let params = SearchParameters::defaults(&DataCoverage::august_2025());
        assert!(export_to_dir(&DisplayTable::default(), &params, dir.path()).is_err());
    }
}
