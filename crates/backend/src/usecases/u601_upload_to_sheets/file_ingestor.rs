use calamine::{Data, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::Cursor;

use super::errors::ParseError;
use super::table::{CellValue, Table};

/// Разобрать загруженный .xlsx файл в таблицу.
///
/// Читается только первый лист. Первая строка даёт имена колонок,
/// остальные строки становятся строками данных.
pub fn parse(bytes: &[u8], file_name: &str) -> Result<Table, ParseError> {
    if !has_xlsx_extension(file_name) {
        return Err(ParseError::UnsupportedFormat {
            file_name: file_name.to_string(),
        });
    }

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ParseError::InvalidWorkbook {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(ParseError::InvalidWorkbook {
                file_name: file_name.to_string(),
                reason: e.to_string(),
            })
        }
        None => {
            return Err(ParseError::NoWorksheet {
                file_name: file_name.to_string(),
            })
        }
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        tracing::debug!("'{}': first worksheet is empty", file_name);
        return Ok(Table::default());
    };

    let columns = column_names(header);
    let data: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    tracing::debug!(
        "'{}': {} columns, {} data rows",
        file_name,
        columns.len(),
        data.len()
    );

    Ok(Table::new(columns, data))
}

fn has_xlsx_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

/// Имена колонок из ячеек заголовка. Пустые становятся `Unnamed: N`,
/// повторы получают `.1`, `.2`, ..., первое вхождение сохраняет имя.
fn column_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let base = match cell_value(cell) {
            CellValue::Empty => format!("Unnamed: {}", idx),
            value => value.to_display_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(name.clone());
        names.push(name);
    }

    names
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        // #N/A, #DIV/0! и т.п. значения не несут
        Data::Error(_) => CellValue::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u601_upload_to_sheets::testing::xlsx_bytes;

    #[test]
    fn test_parses_header_and_rows() {
        let bytes = xlsx_bytes(&[
            &["nombre cliente", "cantidad", "serie"],
            &["Acme", "5", "S1"],
            &["Beta", "2.5", ""],
        ]);

        let table = parse(&bytes, "pedidos.xlsx").unwrap();

        assert_eq!(table.columns, vec!["nombre cliente", "cantidad", "serie"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("Acme".into()));
        assert_eq!(table.rows[0][1], CellValue::Number(5.0));
        assert_eq!(table.rows[1][1], CellValue::Number(2.5));
        assert_eq!(table.rows[1][2], CellValue::Empty);
    }

    #[test]
    fn test_extension_is_checked_case_insensitively() {
        let bytes = xlsx_bytes(&[&["a"], &["1"]]);
        assert!(parse(&bytes, "REPORT.XLSX").is_ok());

        let err = parse(&bytes, "report.csv").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = parse(b"definitely not a zip archive", "broken.xlsx").unwrap_err();
        assert!(matches!(err, ParseError::InvalidWorkbook { .. }));
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let bytes = xlsx_bytes(&[&["serie", "", "serie", "x"], &["S1", "a", "S2", "b"]]);

        let table = parse(&bytes, "dup.xlsx").unwrap();

        assert_eq!(table.columns, vec!["serie", "Unnamed: 1", "serie.1", "x"]);
        assert_eq!(table.rows[0][0], CellValue::Text("S1".into()));
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let bytes = xlsx_bytes(&[&["nombre cliente", "fecha"]]);
        let table = parse(&bytes, "vacio.xlsx").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_date_cells_become_datetimes() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2024, 3, 15).unwrap();
        worksheet.write_string(0, 0, "fecha").unwrap();
        worksheet
            .write_datetime_with_format(1, 0, &date, &date_format)
            .unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = parse(&bytes, "fechas.xlsx").unwrap();

        assert_eq!(table.rows[0][0].to_display_string(), "2024-03-15");
    }

    #[test]
    fn test_error_cells_are_empty() {
        use calamine::CellErrorType;

        assert_eq!(cell_value(&Data::Error(CellErrorType::NA)), CellValue::Empty);
        assert_eq!(cell_value(&Data::Error(CellErrorType::Div0)), CellValue::Empty);
        assert!(cell_value(&Data::Error(CellErrorType::Value)).is_blank());
    }

    #[test]
    fn test_empty_worksheet_reports_first_required_column() {
        let bytes = xlsx_bytes(&[]);

        let table = parse(&bytes, "en_blanco.xlsx").unwrap();
        assert!(table.columns.is_empty());
        assert!(table.is_empty());

        let err = crate::usecases::u601_upload_to_sheets::row_filter::select_upload_rows(&table)
            .unwrap_err();
        assert_eq!(err.column, "nombre cliente");
    }

    #[test]
    fn test_iso_datetime_strings() {
        assert_eq!(
            parse_iso_datetime("2024-01-01").map(|d| d.to_string()),
            Some("2024-01-01 00:00:00".to_string())
        );
        assert!(parse_iso_datetime("2024-01-01T08:30:00").is_some());
        assert!(parse_iso_datetime("yesterday").is_none());
    }
}
