pub mod generate;
pub mod health;
pub mod page;

use axum::{Extension, response::Html};
use metrics_exporter_prometheus::PrometheusHandle;

/// GET / - the empty form
pub async fn index() -> Html<String> {
    Html(page::render_page(&page::PageView::default()))
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics(Extension(handle): Extension<PrometheusHandle>) -> String {
    handle.render()
}
