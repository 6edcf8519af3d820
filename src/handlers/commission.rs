// src/handlers/commission.rs

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{Query, QueryRejection};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::commission::{CommissionReport, FilterOptions, ReportFilters},
};

// Parâmetros repetidos: ?cedente=A&cedente=B
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_periodo"))]
pub struct ReportQuery {
    /// Início do período (inclusivo). Só vale junto com `dataFim`.
    #[param(value_type = Option<String>, format = Date, example = "2024-01-01")]
    pub data_inicio: Option<NaiveDate>,
    /// Fim do período (inclusivo).
    #[param(value_type = Option<String>, format = Date, example = "2024-12-31")]
    pub data_fim: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Selecione no máximo 500 valores."))]
    pub cedente: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Selecione no máximo 500 valores."))]
    pub gerente: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Selecione no máximo 500 valores."))]
    pub etapa: Vec<String>,
}

fn validate_periodo(query: &ReportQuery) -> Result<(), ValidationError> {
    if let (Some(inicio), Some(fim)) = (query.data_inicio, query.data_fim) {
        if inicio > fim {
            let mut err = ValidationError::new("periodo_invertido");
            err.message = Some("A data inicial deve ser anterior ou igual à data final.".into());
            return Err(err);
        }
    }
    Ok(())
}

impl From<ReportQuery> for ReportFilters {
    fn from(q: ReportQuery) -> Self {
        ReportFilters {
            start: q.data_inicio,
            end: q.data_fim,
            cedentes: q.cedente,
            gerentes: q.gerente,
            etapas: q.etapa,
        }
    }
}

fn parse_query(query: Result<Query<ReportQuery>, QueryRejection>) -> Result<ReportFilters, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidQuery(e.to_string()))?;
    query.validate()?;
    Ok(query.into())
}

// GET /api/comissao/relatorio
#[utoipa::path(
    get,
    path = "/api/comissao/relatorio",
    tag = "Comissão",
    params(ReportQuery),
    responses(
        (status = 200, description = "Relatório agrupado com totais e gráficos", body = CommissionReport),
        (status = 400, description = "Parâmetros inválidos"),
        (status = 401, description = "Não autorizado"),
        (status = 503, description = "Banco de dados indisponível")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = parse_query(query).map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .report_service
        .build_report(&caller, &filters)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/comissao/relatorio/pdf
#[utoipa::path(
    get,
    path = "/api/comissao/relatorio/pdf",
    tag = "Comissão",
    params(ReportQuery),
    responses(
        (status = 200, description = "Relatório em PDF (até 20 linhas de detalhe)", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Parâmetros inválidos"),
        (status = 401, description = "Não autorizado"),
        (status = 500, description = "Falha ao gerar o PDF")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn export_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let filters = parse_query(query).map_err(|e| e.to_api_error(&locale))?;

    let report = app_state
        .report_service
        .build_report(&caller, &filters)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    // genpdf é síncrono e pesado: fora do runtime
    let pdf_service = app_state.pdf_service.clone();
    let pdf_bytes = tokio::task::spawn_blocking(move || pdf_service.render(&report))
        .await
        .map_err(|e| AppError::from(anyhow::anyhow!("Falha na task de renderização: {}", e)))
        .and_then(|rendered| rendered)
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let filename = format!(
        "relatorio_comissao_cedentes_{}.pdf",
        Local::now().format("%Y%m%d_%H%M%S")
    );

    // Configura os Headers para o navegador baixar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];

    Ok((headers, pdf_bytes).into_response())
}

// GET /api/comissao/filtros
#[utoipa::path(
    get,
    path = "/api/comissao/filtros",
    tag = "Comissão",
    responses(
        (status = 200, description = "Valores disponíveis para os filtros", body = FilterOptions),
        (status = 401, description = "Não autorizado"),
        (status = 503, description = "Banco de dados indisponível")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_filter_options(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let options = app_state
        .report_service
        .filter_options(&caller)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(options)))
}
