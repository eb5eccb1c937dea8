use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use contracts::usecases::u601_upload_to_sheets::{
    ConnectionStatus, Notice, UploadReport, REQUIRED_HEADERS,
};

use crate::system::state::SharedState;
use crate::usecases::u601_upload_to_sheets::{unavailable_report, UploadExecutor, UploadedFile};

/// GET /api/u601/connection
pub async fn connection_status(State(state): State<SharedState>) -> Json<ConnectionStatus> {
    let (connected, notices) = match &state.connection {
        Ok(_) => (true, vec![Notice::success("Conexión con Google Sheets exitosa.")]),
        Err(e) => (
            false,
            vec![
                Notice::error(format!("Error de autenticación: {}", e)),
                Notice::warning(e.hint()),
            ],
        ),
    };

    Json(ConnectionStatus {
        connected,
        spreadsheet_id: state.spreadsheet_id.clone(),
        notices,
    })
}

/// GET /api/u601/headers
pub async fn required_headers() -> Json<Vec<String>> {
    Json(REQUIRED_HEADERS.iter().map(|h| h.to_string()).collect())
}

/// POST /api/u601/upload
///
/// Multipart форма с одним или несколькими файлами. На любой корректный
/// запрос возвращается отчёт; ошибки файлов и пакета описаны внутри.
pub async fn upload(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<UploadReport>, StatusCode> {
    let files = match read_files(multipart).await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Failed to read upload form: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let session = match &state.connection {
        Ok(session) => session.clone(),
        Err(e) => return Ok(Json(unavailable_report(e))),
    };

    let _batch = state.batch_lock.lock().await;
    let executor = UploadExecutor::new(session, state.spreadsheet_id.clone());
    Ok(Json(executor.run_batch(files).await))
}

/// Файлы в порядке формы. Поля без файла и пустой выбор пропускаются.
async fn read_files(
    mut multipart: Multipart,
) -> Result<Vec<UploadedFile>, axum::extract::multipart::MultipartError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field.bytes().await?;
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }

        tracing::info!("Received file '{}' ({} bytes)", file_name, bytes.len());
        files.push(UploadedFile::new(file_name, bytes.to_vec()));
    }

    Ok(files)
}
