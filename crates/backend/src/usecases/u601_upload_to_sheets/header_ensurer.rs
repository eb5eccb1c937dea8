use super::errors::RemoteError;
use super::sheets_api_client::{SheetRef, SheetStore};

/// Результат проверки заголовков
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Первая строка была пустой или отличалась и перезаписана
    Created,
    /// Первая строка уже совпадала, ничего не записано
    AlreadyPresent,
}

/// Гарантировать, что в первой строке ровно `required`.
///
/// Любое расхождение (порядок, написание, лишние или недостающие ячейки)
/// перезаписывает весь диапазон заголовков; существующие не объединяются.
pub async fn ensure_headers(
    store: &dyn SheetStore,
    sheet: &SheetRef,
    required: &[&str],
) -> Result<HeaderCheck, RemoteError> {
    let current = store.read_header_row(sheet).await?;

    if !current.is_empty() && current.iter().map(String::as_str).eq(required.iter().copied()) {
        tracing::info!("Header row of '{}' already matches", sheet.title);
        return Ok(HeaderCheck::AlreadyPresent);
    }

    tracing::info!(
        "Header row of '{}' is {:?}, writing {:?}",
        sheet.title,
        current,
        required
    );

    let headers: Vec<String> = required.iter().map(|h| h.to_string()).collect();
    store.write_header_row(sheet, &headers).await?;

    Ok(HeaderCheck::Created)
}
