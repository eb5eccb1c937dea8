use thiserror::Error;

/// Ошибка получения сессии Google Sheets.
/// Для процесса окончательная: загрузки заблокированы до исправления
/// учётных данных и перезапуска сервиса.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("no se encontraron las credenciales: {0}")]
    MissingCredentials(String),

    #[error("credenciales mal formadas: {0}")]
    MalformedCredentials(String),

    #[error("el proveedor de identidad rechazó las credenciales: {0}")]
    Rejected(String),

    #[error("error de red durante la autenticación: {0}")]
    Network(String),
}

impl AuthError {
    /// Подсказка пользователю, что проверить
    pub fn hint(&self) -> &'static str {
        match self {
            AuthError::Network(_) => {
                "Por favor, revisa la conexión de red con el proveedor de identidad y reinicia el servicio."
            }
            _ => "Por favor, asegúrate de que el archivo secrets.toml esté correctamente configurado.",
        }
    }
}

/// Ошибка одного вызова Sheets API
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("error de red: {0}")]
    Network(String),

    #[error("permiso denegado (HTTP {status}): {message}")]
    Permission { status: u16, message: String },

    #[error("cuota excedida: {0}")]
    Quota(String),

    #[error("rango no válido: {0}")]
    InvalidRange(String),

    #[error("error de la API (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("respuesta inesperada: {0}")]
    UnexpectedResponse(String),

    #[error("no se pudo renovar el token de acceso: {0}")]
    Token(String),
}

impl RemoteError {
    /// Классификация неуспешного HTTP ответа
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => RemoteError::InvalidRange(message),
            401 | 403 => RemoteError::Permission { status, message },
            429 => RemoteError::Quota(message),
            _ => RemoteError::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::UnexpectedResponse(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

/// Загруженный файл не является пригодной книгой Excel
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("'{file_name}' no es un archivo .xlsx")]
    UnsupportedFormat { file_name: String },

    #[error("'{file_name}' no es un libro de Excel válido: {reason}")]
    InvalidWorkbook { file_name: String, reason: String },

    #[error("'{file_name}' no tiene ninguna hoja")]
    NoWorksheet { file_name: String },
}

/// В загруженной таблице нет обязательной колонки
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no se encontró la columna '{column}'")]
pub struct ColumnMissingError {
    pub column: String,
}

impl ColumnMissingError {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}
