//src/main.rs

use axum::{middleware as axum_middleware, routing::get, Router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não deve iniciar
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Falha ao ler a configuração: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&settings) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Falha ao inicializar o estado da aplicação: {}", e);
            std::process::exit(1);
        }
    };

    // Rotas do relatório (protegidas pelo middleware)
    let comissao_routes = Router::new()
        .route("/relatorio", get(handlers::commission::get_report))
        .route("/relatorio/pdf", get(handlers::commission::export_pdf))
        .route("/filtros", get(handlers::commission::get_filter_options))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/comissao", comissao_routes)
        .with_state(app_state);

    let listener = match TcpListener::bind(&settings.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Falha ao iniciar o listener TCP em {}: {}", settings.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("🚀 Servidor escutando em {}", settings.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Erro no servidor Axum: {}", e);
        std::process::exit(1);
    }
}
