use chrono::Utc;
use contracts::usecases::u601_upload_to_sheets::{
    BatchStatus, FileReport, FileStatus, Notice, NoticeLevel, UploadReport, REQUIRED_HEADERS,
};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{AuthError, ColumnMissingError, ParseError, RemoteError};
use super::file_ingestor;
use super::header_ensurer::{ensure_headers, HeaderCheck};
use super::row_filter::{self, UploadRow};
use super::sheets_api_client::{SheetRef, SheetStore};

/// Сколько строк каждого файла показывать пользователю
pub const PREVIEW_LIMIT: usize = 50;

/// Один файл пакета в том виде, как пришёл из формы
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Итог обработки одного файла; любая ошибка здесь касается только файла
#[derive(Debug)]
pub enum FileOutcome {
    Uploaded {
        rows: usize,
        preview: Vec<Vec<String>>,
    },
    NoValidRows,
    ParseFailed(ParseError),
    ColumnMissing(ColumnMissingError),
    AppendFailed {
        error: RemoteError,
        preview: Vec<Vec<String>>,
    },
}

impl FileOutcome {
    pub fn rows_uploaded(&self) -> usize {
        match self {
            FileOutcome::Uploaded { rows, .. } => *rows,
            _ => 0,
        }
    }
}

/// Сообщения пользователю в порядке появления, дублируются в лог
#[derive(Default)]
struct Notices(Vec<Notice>);

impl Notices {
    fn push(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Success | NoticeLevel::Info => tracing::info!("{}", notice.message),
        }
        self.0.push(notice);
    }

    fn into_inner(self) -> Vec<Notice> {
        self.0
    }
}

/// Executor для UseCase загрузки в Google Sheets
///
/// Один пакет за раз: проверка заголовков один раз, затем каждый файл
/// в порядке отправки: разбор -> проекция/фильтр -> append.
pub struct UploadExecutor {
    store: Arc<dyn SheetStore>,
    spreadsheet_id: String,
}

impl UploadExecutor {
    pub fn new(store: Arc<dyn SheetStore>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            store,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub async fn run_batch(&self, files: Vec<UploadedFile>) -> UploadReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut notices = Notices::default();

        if files.is_empty() {
            notices.push(Notice::warning("Por favor, adjunta al menos un archivo para subir."));
            return UploadReport {
                batch_id,
                status: BatchStatus::NoFiles,
                started_at,
                completed_at: Utc::now(),
                files: Vec::new(),
                total_rows_uploaded: 0,
                notices: notices.into_inner(),
            };
        }

        tracing::info!("Batch {}: {} files", batch_id, files.len());
        notices.push(Notice::info(format!(
            "Iniciando la carga de {}...",
            plural(files.len(), "archivo", "archivos")
        )));

        let sheet = match self.prepare_sheet().await {
            Ok((sheet, check)) => {
                notices.push(Notice::info(match check {
                    HeaderCheck::Created => "Se crearon las cabeceras de las columnas en tu hoja de cálculo.",
                    HeaderCheck::AlreadyPresent => "Las cabeceras ya existen. Se omitió la creación.",
                }));
                sheet
            }
            Err(e) => {
                notices.push(Notice::error(format!(
                    "Error al verificar/crear las cabeceras de la hoja: {}",
                    e
                )));
                notices.push(Notice::warning("El proceso de carga no se puede completar."));
                tracing::warn!("Batch {} aborted before processing any file", batch_id);
                return UploadReport {
                    batch_id,
                    status: BatchStatus::Aborted,
                    started_at,
                    completed_at: Utc::now(),
                    files: Vec::new(),
                    total_rows_uploaded: 0,
                    notices: notices.into_inner(),
                };
            }
        };

        let mut reports = Vec::with_capacity(files.len());
        let mut total_rows_uploaded = 0usize;

        for file in files {
            notices.push(Notice::info(format!("Procesando archivo: {}", file.file_name)));

            let outcome = self.process_file(&sheet, &file).await;
            total_rows_uploaded += outcome.rows_uploaded();

            let report = file_report(&file.file_name, outcome, &mut notices);
            reports.push(report);
        }

        notices.push(Notice::success(format!(
            "¡Carga completa! Se añadieron {} en total a la hoja de cálculo.",
            plural(total_rows_uploaded, "fila", "filas")
        )));

        tracing::info!(
            "Batch {} finished: files={}, rows={}",
            batch_id,
            reports.len(),
            total_rows_uploaded
        );

        UploadReport {
            batch_id,
            status: BatchStatus::Done,
            started_at,
            completed_at: Utc::now(),
            files: reports,
            total_rows_uploaded,
            notices: notices.into_inner(),
        }
    }

    /// Найти первый лист и проверить заголовки
    async fn prepare_sheet(&self) -> Result<(SheetRef, HeaderCheck), RemoteError> {
        let sheet = self.store.first_sheet(&self.spreadsheet_id).await?;
        let check = ensure_headers(self.store.as_ref(), &sheet, &REQUIRED_HEADERS).await?;
        Ok((sheet, check))
    }

    async fn process_file(&self, sheet: &SheetRef, file: &UploadedFile) -> FileOutcome {
        let table = match file_ingestor::parse(&file.bytes, &file.file_name) {
            Ok(table) => table,
            Err(e) => return FileOutcome::ParseFailed(e),
        };

        let rows = match row_filter::select_upload_rows(&table) {
            Ok(rows) => rows,
            Err(e) => return FileOutcome::ColumnMissing(e),
        };

        tracing::info!(
            "'{}': {} of {} rows qualify for upload",
            file.file_name,
            rows.len(),
            table.len()
        );

        if rows.is_empty() {
            return FileOutcome::NoValidRows;
        }

        let preview = preview(&rows);
        let values = rows.iter().map(UploadRow::to_sheet_values).collect();

        match self.store.append_rows(sheet, values).await {
            Ok(written) => FileOutcome::Uploaded {
                rows: written,
                preview,
            },
            Err(error) => FileOutcome::AppendFailed { error, preview },
        }
    }
}

/// Отчёт для пакета, который не запустился из-за ошибки аутентификации
pub fn unavailable_report(err: &AuthError) -> UploadReport {
    let now = Utc::now();
    let mut notices = Notices::default();
    notices.push(Notice::error(format!("Error de autenticación: {}", err)));
    notices.push(Notice::warning(err.hint()));

    UploadReport {
        batch_id: Uuid::new_v4(),
        status: BatchStatus::Unavailable,
        started_at: now,
        completed_at: now,
        files: Vec::new(),
        total_rows_uploaded: 0,
        notices: notices.into_inner(),
    }
}

fn file_report(file_name: &str, outcome: FileOutcome, notices: &mut Notices) -> FileReport {
    let rows_uploaded = outcome.rows_uploaded();

    let (status, message, preview) = match outcome {
        FileOutcome::Uploaded { rows, preview } => {
            let message = format!(
                "Datos de '{}' subidos exitosamente ({}).",
                file_name,
                plural(rows, "fila", "filas")
            );
            notices.push(Notice::success(message.clone()));
            (FileStatus::Uploaded, message, preview)
        }
        FileOutcome::NoValidRows => {
            let message = format!(
                "No se encontraron filas válidas para subir en el archivo '{}'.",
                file_name
            );
            notices.push(Notice::warning(message.clone()));
            (FileStatus::NoValidRows, message, Vec::new())
        }
        FileOutcome::ColumnMissing(e) => {
            let message = format!(
                "Error: La columna '{}' no se encontró en el archivo '{}'.",
                e.column, file_name
            );
            notices.push(Notice::error(message.clone()));
            notices.push(Notice::warning(format!(
                "Por favor, verifica que las columnas {} existan en tu archivo Excel.",
                quoted_list(&REQUIRED_HEADERS)
            )));
            (FileStatus::ColumnMissing, message, Vec::new())
        }
        FileOutcome::ParseFailed(e) => {
            let message = format!("Ocurrió un error al procesar el archivo '{}': {}", file_name, e);
            notices.push(Notice::error(message.clone()));
            notices.push(Notice::warning(
                "Por favor, asegúrate de que el archivo Excel tiene el formato correcto.",
            ));
            (FileStatus::ParseFailed, message, Vec::new())
        }
        FileOutcome::AppendFailed { error, preview } => {
            let message = format!("Ocurrió un error al subir los datos de '{}': {}", file_name, error);
            notices.push(Notice::error(message.clone()));
            notices.push(Notice::warning(
                "Es posible que algunas filas de este archivo ya estén en la hoja de cálculo; revísala antes de volver a subir el archivo.",
            ));
            (FileStatus::AppendFailed, message, preview)
        }
    };

    FileReport {
        file_name: file_name.to_string(),
        status,
        rows_uploaded,
        preview,
        message,
    }
}

fn preview(rows: &[UploadRow]) -> Vec<Vec<String>> {
    rows.iter()
        .take(PREVIEW_LIMIT)
        .map(UploadRow::to_display_strings)
        .collect()
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

/// `'a', 'b' y 'c'`
fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} y {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}
