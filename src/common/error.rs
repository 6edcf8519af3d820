// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Códigos SQLSTATE de falha de autenticação no Postgres
const PG_INVALID_PASSWORD: &str = "28P01";
const PG_INVALID_AUTHORIZATION: &str = "28000";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Parâmetros de consulta inválidos: {0}")]
    InvalidQuery(String),

    // Fatal: o processo não deve subir sem isso
    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("Tabela de gerentes inválida: {0}")]
    MappingConfig(String),

    // Fatal por invocação: sem essas colunas não existe agrupamento
    #[error("Colunas obrigatórias ausentes: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Falha ao gerar o PDF: {0}")]
    PdfRender(String),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

/// Erro já pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Traduz o erro para a resposta do usuário no idioma pedido.
    /// Nada de stack trace ou mensagem interna sai daqui: o detalhe vai para o log.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let en = locale.is_english();
        let pick = |pt: &str, en_msg: &str| if en { en_msg.to_string() } else { pt.to_string() };

        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: pick("Um ou mais campos são inválidos.", "One or more fields are invalid."),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::InvalidQuery(reason) => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: pick("Parâmetros de consulta inválidos.", "Invalid query parameters."),
                details: Some(json!({ "motivo": reason })),
            },
            AppError::InvalidToken | AppError::JwtError(_) => ApiError {
                status: StatusCode::UNAUTHORIZED,
                error: pick(
                    "Token de autenticação inválido ou ausente.",
                    "Invalid or missing authentication token.",
                ),
                details: None,
            },
            AppError::MissingColumns(columns) => {
                tracing::error!("Relatório abortado: {}", self);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: pick(
                        "A consulta não retornou as colunas necessárias para o relatório.",
                        "The query did not return the columns required by the report.",
                    ),
                    details: Some(json!({ "colunas": columns })),
                }
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Erro ao consultar o banco de dados: {}", e);
                let details = is_auth_failure(e).then(|| {
                    json!({
                        "dica": pick(
                            "Verifique se o usuário e a senha do banco estão corretos e se a conta possui acesso ao banco de dados.",
                            "Check the database user and password and whether the account can access the database.",
                        )
                    })
                });
                ApiError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    error: pick(
                        "Não foi possível consultar o banco de dados.",
                        "Could not query the database.",
                    ),
                    details,
                }
            }
            AppError::FontNotFound(_) | AppError::PdfRender(_) => {
                tracing::error!("Falha na exportação: {}", self);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: pick("Não foi possível gerar o PDF.", "Could not generate the PDF."),
                    details: None,
                }
            }
            AppError::Config(_) | AppError::MappingConfig(_) => {
                tracing::error!("Configuração inválida: {}", self);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: pick("Configuração do servidor incompleta.", "Server configuration is incomplete."),
                    details: None,
                }
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: pick("Ocorreu um erro inesperado.", "An unexpected error occurred."),
                    details: None,
                }
            }
        }
    }
}

fn is_auth_failure(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(PG_INVALID_PASSWORD) | Some(PG_INVALID_AUTHORIZATION)
        ),
        _ => false,
    }
}
