// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Comissão ---
        handlers::commission::get_report,
        handlers::commission::export_pdf,
        handlers::commission::get_filter_options,
    ),
    components(
        schemas(
            models::commission::CommissionReport,
            models::commission::ReportRowView,
            models::commission::SummaryStats,
            models::commission::ReportCharts,
            models::commission::ChartEntry,
            models::commission::FilterOptions,
        )
    ),
    tags(
        (name = "Comissão", description = "Relatório de comissionamento por cedente")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
