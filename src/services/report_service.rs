// src/services/report_service.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        format::{format_currency, format_decimal, format_short_date, DEFAULT_DIGITS},
    },
    db::source::OperationSource,
    models::{
        auth::{Caller, CallerRole},
        commission::{
            ChartDimension, CommissionReport, FilterOptions, GroupedRow, OperationSet,
            ReportCharts, ReportFilters, ReportRowView,
        },
    },
    services::{
        access_scope::scope,
        aggregation::{aggregate, top_by, CHART_LIMIT},
        filter_service::{apply_filters, filter_options},
        manager_names::ManagerNameMapping,
    },
};

// Rótulo da linha de total, só na apresentação
pub const TOTAL_LABEL: &str = "TOTAL";

#[derive(Clone)]
pub struct ReportService {
    source: Arc<dyn OperationSource>,
    mapping: Arc<ManagerNameMapping>,
}

impl ReportService {
    pub fn new(source: Arc<dyn OperationSource>, mapping: Arc<ManagerNameMapping>) -> Self {
        Self { source, mapping }
    }

    /// Lê a fonte, normaliza, restringe ao usuário, filtra, agrega e formata.
    pub async fn build_report(
        &self,
        caller: &Caller,
        filters: &ReportFilters,
    ) -> Result<CommissionReport, AppError> {
        let report_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "relatorio_comissao",
            %report_id,
            usuario = %caller.username
        );

        async move {
            let set = self.prepare(caller).await?;
            compute(report_id, set, filters)
        }
        .instrument(span)
        .await
    }

    /// Opções dos seletores, já restritas ao que o usuário pode ver.
    pub async fn filter_options(&self, caller: &Caller) -> Result<FilterOptions, AppError> {
        let set = self.prepare(caller).await?;
        Ok(filter_options(&set))
    }

    // Normalização antes do escopo: o gerente do token também é canonizado
    async fn prepare(&self, caller: &Caller) -> Result<OperationSet, AppError> {
        let set = self.source.fetch_operations().await?;
        let total = set.records.len();

        let role = match &caller.role {
            CallerRole::Admin => CallerRole::Admin,
            CallerRole::Manager(label) => CallerRole::Manager(self.mapping.normalize(label)),
        };

        let records = scope(self.mapping.apply(set.records), &role);
        tracing::debug!(lidas = total, visiveis = records.len(), "Operações carregadas");

        Ok(OperationSet { columns: set.columns, records })
    }
}

fn compute(
    report_id: Uuid,
    set: OperationSet,
    filters: &ReportFilters,
) -> Result<CommissionReport, AppError> {
    let view = apply_filters(&set, filters);
    if view.is_empty() {
        tracing::info!("Nenhum dado encontrado para os filtros selecionados");
    }

    let aggregation = aggregate(&view)?;

    let charts = ReportCharts {
        por_cedente: top_by(&view, ChartDimension::Cedente, CHART_LIMIT).unwrap_or_default(),
        por_gerente: top_by(&view, ChartDimension::Gerente, CHART_LIMIT),
        por_etapa: top_by(&view, ChartDimension::Etapa, CHART_LIMIT),
    };

    let cedentes_filtrados = view
        .iter()
        .filter_map(|r| r.cedente.as_deref())
        .collect::<HashSet<_>>()
        .len();

    let has_captador = aggregation.has_captador;
    let has_prazo_medio = aggregation.has_prazo_medio;
    let to_view = |row: &GroupedRow| format_row(row, has_captador, has_prazo_medio);

    let report = CommissionReport {
        report_id,
        generated_at: Utc::now(),
        filtered: view.len() != set.records.len(),
        total_linhas: view.len(),
        cedentes_filtrados,
        has_captador,
        has_prazo_medio,
        rows: aggregation.rows.iter().map(to_view).collect(),
        rows_with_total: aggregation.rows_with_total.iter().map(to_view).collect(),
        summary: aggregation.summary,
        charts,
        warnings: view.warnings,
    };

    tracing::info!(
        linhas = report.total_linhas,
        grupos = report.rows.len(),
        cedentes = report.cedentes_filtrados,
        "Relatório gerado"
    );

    Ok(report)
}

/// Texto de cada célula. A linha de total leva "TOTAL" na primeira coluna
/// de texto e deixa as demais em branco.
fn format_row(row: &GroupedRow, has_captador: bool, has_prazo_medio: bool) -> ReportRowView {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let (captador, cedente) = match (row.is_total, has_captador) {
        (true, true) => (Some(TOTAL_LABEL.to_string()), String::new()),
        (true, false) => (None, TOTAL_LABEL.to_string()),
        (false, true) => (Some(text(&row.key.captador)), text(&row.key.cedente)),
        (false, false) => (None, text(&row.key.cedente)),
    };

    ReportRowView {
        captador,
        cedente,
        gerente: text(&row.key.gerente),
        etapa: text(&row.key.etapa),
        data: format_short_date(row.data),
        prazo_medio: has_prazo_medio.then(|| {
            row.prazo_medio
                .map(|p| format_decimal(p, DEFAULT_DIGITS))
                .unwrap_or_default()
        }),
        desagio: format_currency(Some(row.valor_desagio)),
        valor_operado: format_currency(Some(row.valor_bruto)),
        is_total: row.is_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::commission::{ColumnSet, OperationRecord};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    struct StaticSource(OperationSet);

    #[async_trait]
    impl OperationSource for StaticSource {
        async fn fetch_operations(&self) -> Result<OperationSet, AppError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl OperationSource for FailingSource {
        async fn fetch_operations(&self) -> Result<OperationSet, AppError> {
            Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
        }
    }

    fn d(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    fn op(cedente: &str, gerente: &str, data: &str, prazo: &str, desagio: &str, bruto: &str) -> OperationRecord {
        OperationRecord {
            captador: None,
            cedente: Some(cedente.into()),
            gerente: Some(gerente.into()),
            etapa: Some("S1".into()),
            data: NaiveDate::parse_from_str(data, "%Y-%m-%d").ok(),
            prazo_medio: d(prazo),
            valor_desagio: d(desagio),
            valor_bruto: d(bruto),
        }
    }

    fn mapping() -> Arc<ManagerNameMapping> {
        let pairs = [("LEANDRO APARECIDO".to_string(), "LEANDRO AP".to_string())];
        Arc::new(ManagerNameMapping::new("teste", pairs).unwrap())
    }

    fn service(records: Vec<OperationRecord>) -> ReportService {
        let set = OperationSet { columns: ColumnSet::standard(), records };
        ReportService::new(Arc::new(StaticSource(set)), mapping())
    }

    fn admin() -> Caller {
        Caller { username: "admin".into(), role: CallerRole::Admin }
    }

    fn manager(label: &str) -> Caller {
        Caller { username: "gerente".into(), role: CallerRole::Manager(label.into()) }
    }

    #[tokio::test]
    async fn single_group_report_is_formatted() {
        let svc = service(vec![
            op("A", "M1", "2024-01-10", "10", "100", "1000"),
            op("A", "M1", "2024-02-15", "20", "200", "3000"),
        ]);
        let report = svc.build_report(&admin(), &ReportFilters::default()).await.unwrap();

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.data, "15/02/2024");
        assert_eq!(row.desagio, "R$ 300,00");
        assert_eq!(row.valor_operado, "R$ 4.000,00");
        assert_eq!(row.prazo_medio.as_deref(), Some("15,00"));

        let total = report.rows_with_total.last().unwrap();
        assert!(total.is_total);
        assert_eq!(total.cedente, TOTAL_LABEL);
        assert_eq!(total.data, "");
        assert_eq!(total.prazo_medio.as_deref(), Some("17,50"));
        assert_eq!(total.valor_operado, "R$ 4.000,00");

        assert!(!report.filtered);
        assert_eq!(report.total_linhas, 2);
        assert_eq!(report.cedentes_filtrados, 1);
    }

    #[tokio::test]
    async fn manager_sees_rows_recorded_under_raw_label() {
        let svc = service(vec![
            op("A", "Leandro Aparecido", "2024-01-10", "10", "1", "100"),
            op("B", "LEANDRO AP", "2024-01-11", "10", "1", "200"),
            op("C", "RFA", "2024-01-12", "10", "1", "300"),
        ]);

        let report = svc
            .build_report(&manager("LEANDRO APARECIDO"), &ReportFilters::default())
            .await
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.gerente == "LEANDRO AP"));
        assert_eq!(report.summary.total_valor_operado, Decimal::from(300));
    }

    #[tokio::test]
    async fn manager_without_operations_gets_empty_report() {
        let svc = service(vec![op("C", "RFA", "2024-01-12", "10", "1", "300")]);
        let report = svc.build_report(&manager("OUTRO"), &ReportFilters::default()).await.unwrap();

        assert!(report.rows.is_empty());
        assert_eq!(report.rows_with_total.len(), 1);
        assert_eq!(report.summary.total_valor_operado, Decimal::ZERO);
        assert_eq!(report.summary.prazo_medio_geral, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn captador_column_holds_total_label() {
        let mut record = op("A", "M1", "2024-01-10", "10", "1", "100");
        record.captador = Some("CAP".into());
        let mut columns = ColumnSet::standard();
        columns.captador = true;
        let set = OperationSet { columns, records: vec![record] };
        let svc = ReportService::new(Arc::new(StaticSource(set)), mapping());

        let report = svc.build_report(&admin(), &ReportFilters::default()).await.unwrap();
        assert_eq!(report.rows[0].captador.as_deref(), Some("CAP"));

        let total = report.rows_with_total.last().unwrap();
        assert_eq!(total.captador.as_deref(), Some(TOTAL_LABEL));
        assert_eq!(total.cedente, "");
    }

    #[tokio::test]
    async fn filters_set_the_filtered_flag() {
        let svc = service(vec![
            op("A", "M1", "2024-01-10", "10", "1", "100"),
            op("B", "M2", "2024-01-11", "10", "1", "200"),
        ]);
        let filters = ReportFilters { cedentes: vec!["B".into()], ..Default::default() };
        let report = svc.build_report(&admin(), &filters).await.unwrap();

        assert!(report.filtered);
        assert_eq!(report.total_linhas, 1);
        assert_eq!(report.charts.por_cedente.len(), 1);
        assert_eq!(report.charts.por_cedente[0].label, "B");
    }

    #[tokio::test]
    async fn source_failure_propagates() {
        let svc = ReportService::new(Arc::new(FailingSource), mapping());
        let err = svc.build_report(&admin(), &ReportFilters::default()).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn options_are_scoped_to_the_caller() {
        let svc = service(vec![
            op("A", "M1", "2024-01-10", "10", "1", "100"),
            op("B", "M2", "2024-03-11", "10", "1", "200"),
        ]);
        let options = svc.filter_options(&manager("M2")).await.unwrap();
        assert_eq!(options.cedentes, vec!["B"]);
        assert_eq!(options.gerentes, vec!["M2"]);
        assert_eq!(options.data_minima, NaiveDate::from_ymd_opt(2024, 3, 11));
    }
}
