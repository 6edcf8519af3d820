// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::{
    common::error::AppError,
    db::{operations_repo::DEFAULT_OPERATIONS_QUERY, OperationsRepository},
    services::{
        auth::AuthService, manager_names::ManagerNameMapping, pdf_service::PdfService,
        report_service::ReportService,
    },
};

const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_MAPPING_PATH: &str = "config/manager_mapping.json";
const DEFAULT_FONTS_DIR: &str = "./fonts";
const DEFAULT_FONT_FAMILY: &str = "Roboto";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Tudo que o processo lê do ambiente na subida.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connect_options: PgConnectOptions,
    pub jwt_secret: String,
    pub mapping_path: PathBuf,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    pub operations_query: String,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    // Variável vazia conta como ausente
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let connect_options = match get("DATABASE_URL") {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| AppError::Config(format!("DATABASE_URL inválida: {}", e)))?,
            None => {
                let required = ["POSTGRES_SERVER", "POSTGRES_DB", "POSTGRES_USER", "POSTGRES_PASSWORD"];
                let missing: Vec<&str> =
                    required.iter().copied().filter(|k| get(k).is_none()).collect();
                if !missing.is_empty() {
                    return Err(AppError::Config(format!(
                        "defina DATABASE_URL ou {}",
                        missing.join(", ")
                    )));
                }

                let port = match get("POSTGRES_PORT") {
                    Some(p) => p.parse::<u16>().map_err(|_| {
                        AppError::Config(format!("POSTGRES_PORT inválida: {}", p))
                    })?,
                    None => DEFAULT_PG_PORT,
                };

                PgConnectOptions::new()
                    .host(&get("POSTGRES_SERVER").unwrap_or_default())
                    .port(port)
                    .database(&get("POSTGRES_DB").unwrap_or_default())
                    .username(&get("POSTGRES_USER").unwrap_or_default())
                    .password(&get("POSTGRES_PASSWORD").unwrap_or_default())
            }
        };

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| AppError::Config("JWT_SECRET deve ser definido".to_string()))?;

        Ok(Self {
            connect_options,
            jwt_secret,
            mapping_path: get("MANAGER_MAPPING_PATH")
                .unwrap_or_else(|| DEFAULT_MAPPING_PATH.to_string())
                .into(),
            fonts_dir: get("FONTS_DIR").unwrap_or_else(|| DEFAULT_FONTS_DIR.to_string()).into(),
            font_family: get("PDF_FONT_FAMILY").unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            operations_query: get("OPERATIONS_QUERY")
                .unwrap_or_else(|| DEFAULT_OPERATIONS_QUERY.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub pdf_service: PdfService,
    pub auth_service: AuthService,
}

impl AppState {
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        // Conexão preguiçosa: o servidor sobe mesmo com o banco fora do ar
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy_with(settings.connect_options.clone());

        let mapping = ManagerNameMapping::from_file(&settings.mapping_path)?;
        tracing::info!(
            versao = mapping.version(),
            entradas = mapping.len(),
            "Tabela de gerentes carregada"
        );

        // --- Monta o gráfico de dependências ---
        let repo = OperationsRepository::new(db_pool, settings.operations_query.clone());
        let report_service = ReportService::new(Arc::new(repo), Arc::new(mapping));
        let pdf_service = PdfService::new(settings.fonts_dir.clone(), settings.font_family.clone());
        let auth_service = AuthService::new(settings.jwt_secret.clone());

        Ok(Self { report_service, pdf_service, auth_service })
    }
}
