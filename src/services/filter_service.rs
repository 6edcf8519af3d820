// src/services/filter_service.rs

use std::collections::{BTreeSet, HashSet};

use crate::models::commission::{
    ColumnSet, FilterOptions, OperationRecord, OperationSet, ReportFilters,
};

/// Projeção somente leitura do conjunto de operações.
#[derive(Debug)]
pub struct FilteredView<'a> {
    pub columns: ColumnSet,
    pub rows: Vec<&'a OperationRecord>,
    pub warnings: Vec<String>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a OperationRecord> + '_ {
        self.rows.iter().copied()
    }
}

/// Aplica período -> cedente -> gerente -> etapa, nessa ordem.
///
/// Coluna ausente não derruba nada: o filtro vira no-op e um aviso é
/// registrado. Seleção vazia significa "sem restrição".
pub fn apply_filters<'a>(set: &'a OperationSet, filters: &ReportFilters) -> FilteredView<'a> {
    let columns = set.columns;
    let mut rows: Vec<&OperationRecord> = set.records.iter().collect();
    let mut warnings = Vec::new();

    // 1. Período
    if columns.data {
        if let Some((start, end)) = filters.date_range() {
            rows.retain(|r| r.data.is_some_and(|d| d >= start && d <= end));
        }
    } else {
        warn_missing(&mut warnings, "DATA");
    }

    // 2. Cedente
    if columns.cedente {
        retain_selected(&mut rows, &filters.cedentes, |r| r.cedente.as_deref());
    } else {
        warn_missing(&mut warnings, "CEDENTE");
    }

    // 3. Gerente
    if columns.gerente {
        retain_selected(&mut rows, &filters.gerentes, |r| r.gerente.as_deref());
    } else {
        warn_missing(&mut warnings, "GERENTE");
    }

    // 4. Etapa
    if columns.etapa {
        retain_selected(&mut rows, &filters.etapas, |r| r.etapa.as_deref());
    } else {
        warn_missing(&mut warnings, "ETAPA");
    }

    FilteredView { columns, rows, warnings }
}

/// Opções para os seletores: valores distintos ordenados e o período total.
pub fn filter_options(set: &OperationSet) -> FilterOptions {
    let distinct = |present: bool, field: fn(&OperationRecord) -> Option<&str>| -> Vec<String> {
        if !present {
            return Vec::new();
        }
        set.records
            .iter()
            .filter_map(field)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    };

    let dates = || set.records.iter().filter_map(|r| r.data);

    FilterOptions {
        cedentes: distinct(set.columns.cedente, |r| r.cedente.as_deref()),
        gerentes: distinct(set.columns.gerente, |r| r.gerente.as_deref()),
        etapas: distinct(set.columns.etapa, |r| r.etapa.as_deref()),
        data_minima: dates().min(),
        data_maxima: dates().max(),
    }
}

fn retain_selected(
    rows: &mut Vec<&OperationRecord>,
    selected: &[String],
    field: impl Fn(&OperationRecord) -> Option<&str>,
) {
    if selected.is_empty() {
        return;
    }
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    rows.retain(|r| field(r).is_some_and(|v| selected.contains(v)));
}

fn warn_missing(warnings: &mut Vec<String>, column: &str) {
    tracing::warn!("Coluna {} ausente: filtro ignorado", column);
    warnings.push(format!("A coluna '{}' não foi encontrada na tabela", column));
}
