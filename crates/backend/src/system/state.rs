use std::sync::Arc;
use tokio::sync::Mutex;

use crate::shared::config::{resolve_path, SheetsConfig};
use crate::usecases::u601_upload_to_sheets::{
    AuthError, ServiceAccountCredentials, SheetStore, SheetsSession,
};

pub type SharedState = Arc<AppState>;

/// Общее состояние процесса для всех handlers
pub struct AppState {
    pub spreadsheet_id: String,
    /// Сессия, созданная при старте; ошибка аутентификации сохраняется
    /// и возвращается на каждый запрос до перезапуска процесса
    pub connection: Result<Arc<dyn SheetStore>, AuthError>,
    /// Пакеты пишут в один общий лист, поэтому выполняются по одному
    pub batch_lock: Mutex<()>,
}

impl AppState {
    /// Загрузить ключ сервисного аккаунта и открыть сессию
    pub async fn connect(config: &SheetsConfig) -> Self {
        let connection = match open_session(config).await {
            Ok(session) => {
                tracing::info!(
                    "Connected to Google Sheets as {} (spreadsheet {})",
                    session.client_email(),
                    config.spreadsheet_id
                );
                Ok(session as Arc<dyn SheetStore>)
            }
            Err(e) => {
                tracing::error!("Authentication error: {}", e);
                tracing::warn!("{}", e.hint());
                Err(e)
            }
        };

        Self::new(config.spreadsheet_id.clone(), connection)
    }

    pub fn new(
        spreadsheet_id: String,
        connection: Result<Arc<dyn SheetStore>, AuthError>,
    ) -> Self {
        Self {
            spreadsheet_id,
            connection,
            batch_lock: Mutex::new(()),
        }
    }
}

async fn open_session(config: &SheetsConfig) -> Result<Arc<SheetsSession>, AuthError> {
    let secrets_path = resolve_path(&config.secrets_path);
    tracing::info!("Reading service account credentials from {}", secrets_path.display());

    let credentials = ServiceAccountCredentials::load(&secrets_path, &config.secrets_table)?;
    let session = SheetsSession::connect(
        credentials,
        &config.api_base_url,
        std::time::Duration::from_secs(config.request_timeout_secs),
    )
    .await?;

    Ok(Arc::new(session))
}
