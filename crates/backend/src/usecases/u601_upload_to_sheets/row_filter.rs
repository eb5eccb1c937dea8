use contracts::usecases::u601_upload_to_sheets::{NON_EMPTY_COLUMNS, REQUIRED_HEADERS};
use serde_json::Value;

use super::errors::ColumnMissingError;
use super::table::{CellValue, Table};

/// Строка в формате заголовков листа
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRow {
    pub client_name: CellValue,
    pub date: CellValue,
    /// `REFERENCIA`
    pub reference_upper: CellValue,
    /// `Referencia`
    pub reference: CellValue,
    pub quantity: CellValue,
    pub serial: CellValue,
}

impl UploadRow {
    fn from_cells(cells: Vec<CellValue>) -> Self {
        let mut it = cells.into_iter();
        let mut next = || it.next().unwrap_or(CellValue::Empty);
        Self {
            client_name: next(),
            date: next(),
            reference_upper: next(),
            reference: next(),
            quantity: next(),
            serial: next(),
        }
    }

    fn cells(&self) -> [&CellValue; 6] {
        [
            &self.client_name,
            &self.date,
            &self.reference_upper,
            &self.reference,
            &self.quantity,
            &self.serial,
        ]
    }

    /// Значения в порядке заголовков, готовые для append
    pub fn to_sheet_values(&self) -> Vec<Value> {
        self.cells().iter().map(|c| c.to_sheet_value()).collect()
    }

    pub fn to_display_strings(&self) -> Vec<String> {
        self.cells().iter().map(|c| c.to_display_string()).collect()
    }
}

/// Выбрать ровно `columns` в этом порядке.
/// Ошибка на первой запрошенной колонке, которой нет в таблице.
pub fn project(table: &Table, columns: &[&str]) -> Result<Table, ColumnMissingError> {
    let indices = column_indices(table, columns)?;

    let rows = table
        .rows
        .iter()
        .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
        .collect();

    Ok(Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// Оставить строки, где все колонки `non_empty` заполнены; порядок сохраняется.
pub fn filter_complete(table: Table, non_empty: &[&str]) -> Result<Table, ColumnMissingError> {
    let indices = column_indices(&table, non_empty)?;

    let Table { columns, rows } = table;
    let rows = rows
        .into_iter()
        .filter(|row| indices.iter().all(|&idx| !row[idx].is_blank()))
        .collect();

    Ok(Table { columns, rows })
}

/// Проекция на заголовки листа, затем фильтр заполненности
pub fn select_upload_rows(table: &Table) -> Result<Vec<UploadRow>, ColumnMissingError> {
    let projected = project(table, &REQUIRED_HEADERS)?;
    let complete = filter_complete(projected, &NON_EMPTY_COLUMNS)?;

    Ok(complete.rows.into_iter().map(UploadRow::from_cells).collect())
}

fn column_indices(table: &Table, columns: &[&str]) -> Result<Vec<usize>, ColumnMissingError> {
    columns
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| ColumnMissingError::new(*name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| text(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_project_reorders_and_drops_columns() {
        let source = table(
            &["extra", "b", "a"],
            &[&["x1", "b1", "a1"], &["x2", "b2", "a2"]],
        );

        let projected = project(&source, &["a", "b"]).unwrap();

        assert_eq!(projected.columns, vec!["a", "b"]);
        assert_eq!(projected.rows[0], vec![text("a1"), text("b1")]);
        assert_eq!(projected.rows[1], vec![text("a2"), text("b2")]);
    }

    #[test]
    fn test_project_reports_first_missing_column() {
        let source = table(&["a"], &[&["1"]]);

        let err = project(&source, &["a", "b", "c"]).unwrap_err();

        assert_eq!(err, ColumnMissingError::new("b"));
    }

    #[test]
    fn test_project_is_case_sensitive() {
        let source = table(&["REFERENCIA"], &[&["R1"]]);
        let err = project(&source, &["Referencia"]).unwrap_err();
        assert_eq!(err.column, "Referencia");
    }

    #[test]
    fn test_filter_keeps_order_and_complete_rows_only() {
        let source = table(
            &["k", "v"],
            &[&["1", "a"], &["2", ""], &["3", "c"], &["", "d"], &["5", "  "]],
        );

        let filtered = filter_complete(source, &["k", "v"]).unwrap();

        let keys: Vec<String> = filtered
            .rows
            .iter()
            .map(|r| r[0].to_display_string())
            .collect();
        assert_eq!(keys, vec!["1", "3"]);
    }

    #[test]
    fn test_optional_columns_may_be_empty() {
        let source = table(
            &REQUIRED_HEADERS,
            &[&["", "", "", "R1", "5", "S1"], &["B", "", "", "", "", ""]],
        );

        let rows = select_upload_rows(&source).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference, text("R1"));
        assert_eq!(rows[0].client_name, CellValue::Empty);
    }

    #[test]
    fn test_each_required_value_is_checked() {
        let source = table(
            &REQUIRED_HEADERS,
            &[
                &["A", "", "", "", "5", "S1"],
                &["B", "", "", "R2", "", "S2"],
                &["C", "", "", "R3", "7", ""],
                &["D", "", "X", "R4", "8", "S4"],
            ],
        );

        let rows = select_upload_rows(&source).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client_name, text("D"));
        assert_eq!(rows[0].reference_upper, text("X"));
    }

    #[test]
    fn test_upload_row_values_follow_header_order() {
        let mut columns: Vec<&str> = REQUIRED_HEADERS.to_vec();
        columns.reverse();
        let source = table(&columns, &[&["S1", "5", "R1", "RU", "2024-01-01", "A"]]);

        let rows = select_upload_rows(&source).unwrap();

        assert_eq!(
            rows[0].to_display_strings(),
            vec!["A", "2024-01-01", "RU", "R1", "5", "S1"]
        );
    }

    #[test]
    fn test_missing_serie_column() {
        let source = table(
            &["nombre cliente", "fecha", "REFERENCIA", "Referencia", "cantidad"],
            &[&["A", "", "", "R1", "5"]],
        );

        let err = select_upload_rows(&source).unwrap_err();

        assert_eq!(err.column, "serie");
    }
}
