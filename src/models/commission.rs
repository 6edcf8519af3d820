// src/models/commission.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Ingestão ---

/// Uma operação como veio da fonte, já com nomes de coluna normalizados.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRecord {
    pub captador: Option<String>,
    pub cedente: Option<String>,
    pub gerente: Option<String>,
    pub etapa: Option<String>,
    pub data: Option<NaiveDate>,
    pub prazo_medio: Option<Decimal>,
    pub valor_desagio: Option<Decimal>,
    pub valor_bruto: Option<Decimal>,
}

/// Quais colunas conhecidas a consulta devolveu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSet {
    pub captador: bool,
    pub cedente: bool,
    pub gerente: bool,
    pub etapa: bool,
    pub data: bool,
    pub prazo_medio: bool,
    pub valor_desagio: bool,
    pub valor_bruto: bool,
}

impl ColumnSet {
    /// Todas as colunas da consulta padrão (sem captador).
    #[cfg(test)]
    pub fn standard() -> Self {
        Self {
            captador: false,
            cedente: true,
            gerente: true,
            etapa: true,
            data: true,
            prazo_medio: true,
            valor_desagio: true,
            valor_bruto: true,
        }
    }

    /// Monta o conjunto a partir de nomes já em minúsculas.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for name in names {
            match name {
                "captador" => set.captador = true,
                "cedente" => set.cedente = true,
                "gerente" => set.gerente = true,
                "etapa" => set.etapa = true,
                "data" => set.data = true,
                "prazo_medio" => set.prazo_medio = true,
                "valor_desagio" => set.valor_desagio = true,
                "valor_bruto" => set.valor_bruto = true,
                _ => {}
            }
        }
        set
    }

    /// Colunas sem as quais não há agrupamento nem agregação.
    pub fn missing_for_aggregation(&self) -> Vec<String> {
        [
            ("cedente", self.cedente),
            ("gerente", self.gerente),
            ("etapa", self.etapa),
            ("data", self.data),
            ("valor_desagio", self.valor_desagio),
            ("valor_bruto", self.valor_bruto),
        ]
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

/// Resultado de uma leitura da fonte. Pertence a uma única invocação.
#[derive(Debug, Clone, Default)]
pub struct OperationSet {
    pub columns: ColumnSet,
    pub records: Vec<OperationRecord>,
}

// --- Filtros ---

#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub cedentes: Vec<String>,
    pub gerentes: Vec<String>,
    pub etapas: Vec<String>,
}

impl ReportFilters {
    /// O período só vale com as duas pontas escolhidas.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.start.zip(self.end)
    }
}

/// Valores disponíveis para os seletores do cliente.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub cedentes: Vec<String>,
    pub gerentes: Vec<String>,
    pub etapas: Vec<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2024-01-02")]
    pub data_minima: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date, example = "2024-12-30")]
    pub data_maxima: Option<NaiveDate>,
}

// --- Agregação ---

/// Chave de agrupamento. Componentes nulos formam o próprio grupo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub captador: Option<String>,
    pub cedente: Option<String>,
    pub gerente: Option<String>,
    pub etapa: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub key: GroupKey,
    pub data: Option<NaiveDate>,
    pub valor_desagio: Decimal,
    pub valor_bruto: Decimal,
    // Média simples no grupo, ponderada na linha de total
    pub prazo_medio: Option<Decimal>,
    pub is_total: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    #[schema(value_type = f64, example = 300.0)]
    pub total_desagio: Decimal,
    #[schema(value_type = f64, example = 4000.0)]
    pub total_valor_operado: Decimal,
    #[schema(value_type = Option<f64>, example = 17.5)]
    pub prazo_medio_geral: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub has_captador: bool,
    pub has_prazo_medio: bool,
    pub rows: Vec<GroupedRow>,
    pub rows_with_total: Vec<GroupedRow>,
    pub summary: SummaryStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartDimension {
    Cedente,
    Gerente,
    Etapa,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    #[schema(example = "ACME FOMENTO LTDA")]
    pub label: String,
    #[schema(value_type = f64, example = 4000.0)]
    pub valor_operado: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportCharts {
    pub por_cedente: Vec<ChartEntry>,
    pub por_gerente: Option<Vec<ChartEntry>>,
    pub por_etapa: Option<Vec<ChartEntry>>,
}

// --- Apresentação ---

/// Linha do relatório já formatada para exibição e exportação.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRowView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captador: Option<String>,
    #[schema(example = "ACME FOMENTO LTDA")]
    pub cedente: String,
    #[schema(example = "RFA")]
    pub gerente: String,
    #[schema(example = "Liquidada")]
    pub etapa: String,
    #[schema(example = "15/02/2024")]
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "15,00")]
    pub prazo_medio: Option<String>,
    #[schema(example = "R$ 300,00")]
    pub desagio: String,
    #[schema(example = "R$ 4.000,00")]
    pub valor_operado: String,
    pub is_total: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Se os filtros reduziram o conjunto visível ao usuário.
    pub filtered: bool,
    #[schema(example = 12)]
    pub total_linhas: usize,
    #[schema(example = 10)]
    pub cedentes_filtrados: usize,
    pub has_captador: bool,
    pub has_prazo_medio: bool,
    pub rows: Vec<ReportRowView>,
    pub rows_with_total: Vec<ReportRowView>,
    pub summary: SummaryStats,
    pub charts: ReportCharts,
    pub warnings: Vec<String>,
}
