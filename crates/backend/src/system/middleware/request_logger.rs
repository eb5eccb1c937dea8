use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware для логирования HTTP запросов
///
/// Выводит метод, путь, статус код и длительность каждого запроса.
/// Тело запроса и ответа не читается.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if status.is_success() {
        tracing::info!("{} {} -> {} ({}ms)", method, path, status.as_u16(), elapsed_ms);
    } else {
        tracing::warn!("{} {} -> {} ({}ms)", method, path, status.as_u16(), elapsed_ms);
    }

    response
}
