use super::{HousingData, Record};
use crate::error::Result;
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parse a cell into a number. Returns None for text cells (e.g. the `date` column)
/// and for empty cells
fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Parse a CSV stream with a header line. Every row becomes a record mapping
/// column name to value, keeping only the numeric cells
pub fn parse_reader<R: Read>(reader: R) -> Result<HousingData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    let mut records = vec![];

    for row in reader.records() {
        let row = row?;
        let record: Record = columns
            .iter()
            .zip(row.iter())
            .filter_map(|(name, cell)| parse_cell(cell).map(|value| (name.clone(), value)))
            .collect();

        records.push(record);
    }

    debug!("parsed {} columns: {:?}", columns.len(), columns);

    Ok(HousingData { columns, records })
}

/// Load the housing dataset from a CSV file
pub fn parse_dataset<P: AsRef<Path>>(path: P) -> Result<HousingData> {
    let file = File::open(path.as_ref())?;
    let data = parse_reader(file)?;

    info!(
        "loaded {} rows from {}",
        data.len(),
        path.as_ref().display()
    );

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,date,price,bedrooms,sqft_living
7129300520,20141013T000000,221900,3,1180
6414100192,20141209T000000,538000,3,2570
5631500400,20150225T000000,180000,2,770
";

    #[test]
    fn test_parse_numeric_cells() {
        let data = parse_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.columns[2], "price");
        assert_eq!(data.records[1]["price"], 538000.0);
        assert_eq!(data.records[2]["sqft_living"], 770.0);
        // Text cells are left out of the record
        assert!(!data.records[0].contains_key("date"));
    }

    #[test]
    fn test_available_features_skip_ignored_columns() {
        let data = parse_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(data.available_features(), vec!["bedrooms", "sqft_living"]);
        assert!(data.has_column("id"));
        assert!(!data.has_column("floors"));
    }

    #[test]
    fn test_header_only() {
        let data = parse_reader("price,bedrooms\n".as_bytes()).unwrap();

        assert!(data.is_empty());
        assert_eq!(data.available_features(), vec!["bedrooms"]);
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_dataset("/nonexistent/houses.csv").is_err());
    }
}
