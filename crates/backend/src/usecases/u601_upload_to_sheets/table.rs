use chrono::{NaiveDateTime, Timelike};
use serde_json::Value;

/// Значение одной ячейки загруженной книги
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Пустые ячейки и текст из одних пробелов считаются отсутствующими
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) | CellValue::DateTime(_) => false,
        }
    }

    /// Текстовое представление для заголовков и предпросмотра
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => format_datetime(dt),
        }
    }

    /// JSON значение для Sheets API
    pub fn to_sheet_value(&self) -> Value {
        match self {
            CellValue::Empty => Value::String(String::new()),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Number(n) => number_to_json(*n),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::DateTime(dt) => Value::String(format_datetime(dt)),
        }
    }
}

fn is_whole(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64
}

fn format_number(n: f64) -> String {
    if is_whole(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn number_to_json(n: f64) -> Value {
    if is_whole(n) {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(String::new()))
    }
}

/// Даты без времени пишутся как простые даты
fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Таблица в памяти: именованные колонки и строки, дополненные до их числа
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Индекс первой колонки с точно таким именем
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
