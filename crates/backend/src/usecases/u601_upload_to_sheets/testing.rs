//! Test helpers: an in-memory sheet and in-memory workbook fixtures.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use super::errors::RemoteError;
use super::sheets_api_client::{SheetRef, SheetStore};

#[derive(Default)]
struct SheetState {
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
    header_reads: usize,
    header_writes: usize,
    append_calls: usize,
}

/// Лист в памяти; отдельные вызовы можно заставить падать
#[derive(Default)]
pub(crate) struct InMemoryStore {
    state: Mutex<SheetState>,
    fail_first_sheet: bool,
    fail_header_read: bool,
    fail_header_write: bool,
    /// Номер (с 1) вызова append, который падает
    fail_append_call: Option<usize>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_header(header: &[&str]) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().header = header.iter().map(|h| h.to_string()).collect();
        store
    }

    pub(crate) fn failing_first_sheet(mut self) -> Self {
        self.fail_first_sheet = true;
        self
    }

    pub(crate) fn failing_header_read(mut self) -> Self {
        self.fail_header_read = true;
        self
    }

    pub(crate) fn failing_header_write(mut self) -> Self {
        self.fail_header_write = true;
        self
    }

    pub(crate) fn failing_append_call(mut self, call: usize) -> Self {
        self.fail_append_call = Some(call);
        self
    }

    pub(crate) fn header(&self) -> Vec<String> {
        self.state.lock().unwrap().header.clone()
    }

    pub(crate) fn rows(&self) -> Vec<Vec<Value>> {
        self.state.lock().unwrap().rows.clone()
    }

    pub(crate) fn header_reads(&self) -> usize {
        self.state.lock().unwrap().header_reads
    }

    pub(crate) fn header_writes(&self) -> usize {
        self.state.lock().unwrap().header_writes
    }

    pub(crate) fn append_calls(&self) -> usize {
        self.state.lock().unwrap().append_calls
    }
}

#[async_trait]
impl SheetStore for InMemoryStore {
    async fn first_sheet(&self, spreadsheet_id: &str) -> Result<SheetRef, RemoteError> {
        if self.fail_first_sheet {
            return Err(RemoteError::Network("connection reset".into()));
        }
        Ok(SheetRef::new(spreadsheet_id, "Hoja 1"))
    }

    async fn read_header_row(&self, _sheet: &SheetRef) -> Result<Vec<String>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.header_reads += 1;
        if self.fail_header_read {
            return Err(RemoteError::Quota("read requests per minute".into()));
        }
        Ok(state.header.clone())
    }

    async fn write_header_row(
        &self,
        _sheet: &SheetRef,
        headers: &[String],
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if self.fail_header_write {
            return Err(RemoteError::Permission {
                status: 403,
                message: "read-only".into(),
            });
        }
        state.header = headers.to_vec();
        state.header_writes += 1;
        Ok(())
    }

    async fn append_rows(
        &self,
        _sheet: &SheetRef,
        rows: Vec<Vec<Value>>,
    ) -> Result<usize, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.append_calls += 1;
        if self.fail_append_call == Some(state.append_calls) {
            return Err(RemoteError::Api {
                status: 500,
                message: "backend error".into(),
            });
        }
        let written = rows.len();
        state.rows.extend(rows);
        Ok(written)
    }
}

/// Собрать .xlsx книгу в памяти. Первая строка пишется текстом,
/// остальные ячейки числами, если парсятся как число; пустые пропускаются.
pub(crate) fn xlsx_bytes(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let (r, c) = (r as u32, c as u16);
            let written = match cell.parse::<f64>() {
                Ok(n) if r > 0 => worksheet.write_number(r, c, n).map(|_| ()),
                _ => worksheet.write_string(r, c, *cell).map(|_| ()),
            };
            written.unwrap();
        }
    }

    workbook.save_to_buffer().unwrap()
}
