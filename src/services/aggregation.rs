// src/services/aggregation.rs

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::commission::{
        Aggregation, ChartDimension, ChartEntry, GroupKey, GroupedRow, OperationRecord,
        SummaryStats,
    },
    services::filter_service::FilteredView,
};

pub const CHART_LIMIT: usize = 10;

#[derive(Default)]
struct GroupAcc {
    data: Option<NaiveDate>,
    valor_desagio: Decimal,
    valor_bruto: Decimal,
    prazo_soma: Decimal,
    prazo_qtd: u32,
}

/// Agrupa por (captador?, cedente, gerente, etapa) e fecha a linha de total.
///
/// Por grupo o prazo médio é média simples; no total ele é ponderado pelo
/// valor bruto. As duas fórmulas são diferentes de propósito e os totais são
/// somados sobre a visão inteira, não sobre os subtotais.
pub fn aggregate(view: &FilteredView<'_>) -> Result<Aggregation, AppError> {
    let missing = view.columns.missing_for_aggregation();
    if !missing.is_empty() {
        return Err(AppError::MissingColumns(missing));
    }

    let has_captador = view.columns.captador;
    let has_prazo_medio = view.columns.prazo_medio;

    // Ordem de primeira aparição
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, GroupAcc)> = Vec::new();

    for record in view.iter() {
        let key = group_key(record, has_captador);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, GroupAcc::default()));
                groups.len() - 1
            }
        };

        let acc = &mut groups[slot].1;
        acc.data = acc.data.max(record.data);
        acc.valor_desagio += record.valor_desagio.unwrap_or_default();
        acc.valor_bruto += record.valor_bruto.unwrap_or_default();
        if has_prazo_medio {
            if let Some(prazo) = record.prazo_medio {
                acc.prazo_soma += prazo;
                acc.prazo_qtd += 1;
            }
        }
    }

    let rows: Vec<GroupedRow> = groups
        .into_iter()
        .map(|(key, acc)| GroupedRow {
            key,
            data: acc.data,
            valor_desagio: acc.valor_desagio,
            valor_bruto: acc.valor_bruto,
            prazo_medio: (acc.prazo_qtd > 0).then(|| acc.prazo_soma / Decimal::from(acc.prazo_qtd)),
            is_total: false,
        })
        .collect();

    let summary = summarize(view, has_prazo_medio);

    let mut rows_with_total = rows.clone();
    rows_with_total.push(GroupedRow {
        key: GroupKey::default(),
        data: None,
        valor_desagio: summary.total_desagio,
        valor_bruto: summary.total_valor_operado,
        prazo_medio: summary.prazo_medio_geral,
        is_total: true,
    });

    tracing::debug!(
        grupos = rows.len(),
        linhas = view.len(),
        "Agregação concluída"
    );

    Ok(Aggregation { has_captador, has_prazo_medio, rows, rows_with_total, summary })
}

fn group_key(record: &OperationRecord, has_captador: bool) -> GroupKey {
    GroupKey {
        captador: if has_captador { record.captador.clone() } else { None },
        cedente: record.cedente.clone(),
        gerente: record.gerente.clone(),
        etapa: record.etapa.clone(),
    }
}

// Totais calculados direto sobre a visão filtrada
fn summarize(view: &FilteredView<'_>, has_prazo_medio: bool) -> SummaryStats {
    let mut total_desagio = Decimal::ZERO;
    let mut total_valor_operado = Decimal::ZERO;
    let mut prazo_ponderado = Decimal::ZERO;

    for record in view.iter() {
        let bruto = record.valor_bruto.unwrap_or_default();
        total_desagio += record.valor_desagio.unwrap_or_default();
        total_valor_operado += bruto;
        if let Some(prazo) = record.prazo_medio {
            prazo_ponderado += prazo * bruto;
        }
    }

    let prazo_medio_geral = has_prazo_medio.then(|| {
        if total_valor_operado.is_zero() {
            Decimal::ZERO
        } else {
            prazo_ponderado / total_valor_operado
        }
    });

    SummaryStats { total_desagio, total_valor_operado, prazo_medio_geral }
}

/// Valor operado por uma dimensão, do maior para o menor, cortado em `limit`.
/// `None` quando a coluna não existe na fonte.
pub fn top_by(
    view: &FilteredView<'_>,
    dimension: ChartDimension,
    limit: usize,
) -> Option<Vec<ChartEntry>> {
    let present = match dimension {
        ChartDimension::Cedente => view.columns.cedente,
        ChartDimension::Gerente => view.columns.gerente,
        ChartDimension::Etapa => view.columns.etapa,
    };
    if !present {
        return None;
    }

    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for record in view.iter() {
        let label = match dimension {
            ChartDimension::Cedente => record.cedente.as_deref(),
            ChartDimension::Gerente => record.gerente.as_deref(),
            ChartDimension::Etapa => record.etapa.as_deref(),
        };
        if let Some(label) = label {
            *totals.entry(label).or_default() += record.valor_bruto.unwrap_or_default();
        }
    }

    // BTreeMap já está em ordem alfabética; o sort estável mantém isso nos empates
    let mut entries: Vec<ChartEntry> = totals
        .into_iter()
        .map(|(label, valor_operado)| ChartEntry { label: label.to_string(), valor_operado })
        .collect();
    entries.sort_by(|a, b| b.valor_operado.cmp(&a.valor_operado));
    entries.truncate(limit);
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::commission::{ColumnSet, OperationSet, ReportFilters},
        services::filter_service::apply_filters,
    };
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn op(
        cedente: &str,
        gerente: &str,
        etapa: &str,
        data: &str,
        prazo: Option<&str>,
        desagio: &str,
        bruto: &str,
    ) -> OperationRecord {
        OperationRecord {
            captador: None,
            cedente: Some(cedente.into()),
            gerente: Some(gerente.into()),
            etapa: Some(etapa.into()),
            data: Some(date(data)),
            prazo_medio: prazo.map(d),
            valor_desagio: Some(d(desagio)),
            valor_bruto: Some(d(bruto)),
        }
    }

    fn set(records: Vec<OperationRecord>) -> OperationSet {
        OperationSet { columns: ColumnSet::standard(), records }
    }

    fn run(set: &OperationSet) -> Aggregation {
        aggregate(&apply_filters(set, &ReportFilters::default())).unwrap()
    }

    #[test]
    fn two_rows_one_group() {
        let set = set(vec![
            op("A", "M1", "S1", "2024-01-10", Some("10"), "100", "1000"),
            op("A", "M1", "S1", "2024-02-15", Some("20"), "200", "3000"),
        ]);
        let agg = run(&set);

        assert_eq!(agg.rows.len(), 1);
        let row = &agg.rows[0];
        assert_eq!(row.data, Some(date("2024-02-15")));
        assert_eq!(row.valor_desagio, d("300"));
        assert_eq!(row.valor_bruto, d("4000"));
        assert_eq!(row.prazo_medio, Some(d("15")));

        assert_eq!(agg.summary.total_desagio, d("300"));
        assert_eq!(agg.summary.total_valor_operado, d("4000"));
        assert_eq!(agg.summary.prazo_medio_geral, Some(d("17.5")));
    }

    #[test]
    fn simple_and_weighted_means_differ() {
        let set = set(vec![
            op("A", "M1", "S1", "2024-01-10", Some("10"), "0", "100"),
            op("A", "M1", "S1", "2024-01-11", Some("50"), "0", "900"),
            op("B", "M2", "S1", "2024-01-12", Some("30"), "0", "500"),
            op("B", "M2", "S1", "2024-01-13", Some("90"), "0", "500"),
        ]);
        let agg = run(&set);

        assert_eq!(agg.rows[0].prazo_medio, Some(d("30")));
        assert_eq!(agg.rows[1].prazo_medio, Some(d("60")));
        // (10*100 + 50*900 + 30*500 + 90*500) / 2000 = 53
        assert_eq!(agg.summary.prazo_medio_geral, Some(d("53")));
        assert_ne!(agg.summary.prazo_medio_geral, agg.rows[0].prazo_medio);
    }

    #[test]
    fn totals_reconcile_with_groups() {
        let set = set(vec![
            op("A", "M1", "S1", "2024-01-10", Some("10"), "10.10", "1000.33"),
            op("B", "M1", "S2", "2024-01-11", None, "20.20", "2000.33"),
            op("A", "M2", "S1", "2024-01-12", Some("5"), "30.30", "3000.34"),
            op("A", "M1", "S1", "2024-01-13", Some("7"), "0.01", "0.99"),
        ]);
        let agg = run(&set);

        let desagio: Decimal = agg.rows.iter().map(|r| r.valor_desagio).sum();
        let bruto: Decimal = agg.rows.iter().map(|r| r.valor_bruto).sum();
        assert_eq!(desagio, agg.summary.total_desagio);
        assert_eq!(bruto, agg.summary.total_valor_operado);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let set = set(vec![
            op("Z", "M1", "S1", "2024-01-10", None, "1", "1"),
            op("A", "M1", "S1", "2024-01-10", None, "1", "1"),
            op("Z", "M1", "S1", "2024-01-11", None, "1", "1"),
        ]);
        let agg = run(&set);
        let cedentes: Vec<_> = agg.rows.iter().map(|r| r.key.cedente.as_deref()).collect();
        assert_eq!(cedentes, vec![Some("Z"), Some("A")]);
    }

    #[test]
    fn totals_row_is_last_and_tagged() {
        let set = set(vec![op("A", "M1", "S1", "2024-01-10", Some("10"), "1", "2")]);
        let agg = run(&set);
        assert_eq!(agg.rows_with_total.len(), agg.rows.len() + 1);
        let total = agg.rows_with_total.last().unwrap();
        assert!(total.is_total);
        assert_eq!(total.key, GroupKey::default());
        assert!(agg.rows.iter().all(|r| !r.is_total));
    }

    #[test]
    fn null_keys_form_their_own_group() {
        let mut no_gerente = op("A", "x", "S1", "2024-01-10", None, "1", "10");
        no_gerente.gerente = None;
        let set = set(vec![
            no_gerente.clone(),
            op("A", "M1", "S1", "2024-01-10", None, "1", "10"),
            no_gerente,
        ]);
        let agg = run(&set);
        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.rows[0].key.gerente, None);
        assert_eq!(agg.rows[0].valor_bruto, d("20"));
    }

    #[test]
    fn nulls_count_as_zero_and_skip_means() {
        let mut row = op("A", "M1", "S1", "2024-01-10", None, "0", "0");
        row.valor_desagio = None;
        row.valor_bruto = None;
        row.data = None;
        let set = set(vec![row, op("A", "M1", "S1", "2024-01-09", Some("12"), "5", "50")]);
        let agg = run(&set);

        assert_eq!(agg.rows[0].valor_desagio, d("5"));
        assert_eq!(agg.rows[0].valor_bruto, d("50"));
        assert_eq!(agg.rows[0].prazo_medio, Some(d("12")));
        assert_eq!(agg.rows[0].data, Some(date("2024-01-09")));
    }

    #[test]
    fn zero_gross_gives_zero_weighted_term() {
        let set = set(vec![op("A", "M1", "S1", "2024-01-10", Some("30"), "0", "0")]);
        let agg = run(&set);
        assert_eq!(agg.summary.prazo_medio_geral, Some(Decimal::ZERO));
    }

    #[test]
    fn without_term_column_there_is_no_term() {
        let mut set = set(vec![op("A", "M1", "S1", "2024-01-10", Some("30"), "0", "10")]);
        set.columns.prazo_medio = false;
        let agg = run(&set);
        assert!(!agg.has_prazo_medio);
        assert_eq!(agg.rows[0].prazo_medio, None);
        assert_eq!(agg.summary.prazo_medio_geral, None);
    }

    #[test]
    fn captador_widens_the_key() {
        let mut a = op("A", "M1", "S1", "2024-01-10", None, "1", "10");
        let mut b = a.clone();
        a.captador = Some("C1".into());
        b.captador = Some("C2".into());
        let mut set = set(vec![a, b]);

        set.columns.captador = true;
        assert_eq!(run(&set).rows.len(), 2);

        set.columns.captador = false;
        assert_eq!(run(&set).rows.len(), 1);
    }

    #[test]
    fn missing_grouping_column_is_fatal() {
        let mut set = set(vec![op("A", "M1", "S1", "2024-01-10", None, "1", "10")]);
        set.columns.gerente = false;
        let view = apply_filters(&set, &ReportFilters::default());
        let err = aggregate(&view).unwrap_err();
        assert!(matches!(err, AppError::MissingColumns(cols) if cols == vec!["gerente"]));
    }

    #[test]
    fn chart_is_sorted_desc_and_truncated() {
        let mut records = Vec::new();
        for i in 0..12 {
            let bruto = format!("{}", (i + 1) * 100);
            records.push(op(&format!("C{:02}", i), "M1", "S1", "2024-01-10", None, "0", &bruto));
        }
        records.push(op("C00", "M2", "S1", "2024-01-11", None, "0", "5000"));
        let set = set(records);
        let view = apply_filters(&set, &ReportFilters::default());

        let chart = top_by(&view, ChartDimension::Cedente, CHART_LIMIT).unwrap();
        assert_eq!(chart.len(), 10);
        assert_eq!(chart[0].label, "C00");
        assert_eq!(chart[0].valor_operado, d("5100"));
        assert_eq!(chart[1].label, "C11");

        let by_manager = top_by(&view, ChartDimension::Gerente, CHART_LIMIT).unwrap();
        assert_eq!(by_manager[0].label, "M1");
        assert_eq!(by_manager[0].valor_operado, d("7800"));
    }

    #[test]
    fn chart_needs_its_column() {
        let mut set = set(vec![op("A", "M1", "S1", "2024-01-10", None, "0", "1")]);
        set.columns.etapa = false;
        let view = apply_filters(&set, &ReportFilters::default());
        assert!(top_by(&view, ChartDimension::Etapa, CHART_LIMIT).is_none());
    }
}
