// src/db/operations_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use sqlx::{postgres::PgRow, Column, Executor, PgPool, Row};

use crate::{
    common::error::AppError,
    db::source::OperationSource,
    models::commission::{ColumnSet, OperationRecord, OperationSet},
};

// Operações com o gerente vindo do cadastro consolidado de cedentes
pub const DEFAULT_OPERATIONS_QUERY: &str = r#"
    SELECT
        f.cedente,
        d.gerente,
        f.etapa,
        f.data,
        f.prazo_medio,
        f.valor_desagio,
        f.valor_bruto
    FROM fato_operacoes f
    LEFT JOIN dimcedentesconsolidado d
        ON f.cpf_cnpj_cedente = d.cpf_cnpj
"#;

#[derive(Clone)]
pub struct OperationsRepository {
    pool: PgPool,
    query: String,
}

impl OperationsRepository {
    pub fn new(pool: PgPool, query: String) -> Self {
        Self { pool, query }
    }
}

#[async_trait]
impl OperationSource for OperationsRepository {
    async fn fetch_operations(&self) -> Result<OperationSet, AppError> {
        let rows = sqlx::query(&self.query).fetch_all(&self.pool).await?;

        // Sem linhas não há de onde ler os nomes: pergunta ao banco
        let names: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self
                .pool
                .describe(&self.query)
                .await?
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };

        let index = ColumnIndex::new(&names);
        let records = rows.iter().map(|row| index.decode(row)).collect();

        Ok(OperationSet { columns: index.columns(), records })
    }
}

/// Posição de cada coluna conhecida, com o nome já em minúsculas.
/// É o único lugar onde a caixa dos nomes importa.
struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(names: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            positions.entry(normalize_column_name(name)).or_insert(i);
        }
        Self { positions }
    }

    fn columns(&self) -> ColumnSet {
        ColumnSet::from_names(self.positions.keys().map(String::as_str))
    }

    fn decode(&self, row: &PgRow) -> OperationRecord {
        OperationRecord {
            captador: self.text(row, "captador"),
            cedente: self.text(row, "cedente"),
            gerente: self.text(row, "gerente"),
            etapa: self.text(row, "etapa"),
            data: self.date(row, "data"),
            prazo_medio: self.decimal(row, "prazo_medio"),
            valor_desagio: self.decimal(row, "valor_desagio"),
            valor_bruto: self.decimal(row, "valor_bruto"),
        }
    }

    fn text(&self, row: &PgRow, name: &str) -> Option<String> {
        let idx = *self.positions.get(name)?;
        row.try_get::<Option<String>, _>(idx).ok().flatten()
    }

    // numeric, float ou inteiro; NaN vira nulo
    fn decimal(&self, row: &PgRow, name: &str) -> Option<Decimal> {
        let idx = *self.positions.get(name)?;
        if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
            return v;
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.and_then(Decimal::from_f64);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.and_then(Decimal::from_f32);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Decimal::from);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(Decimal::from);
        }
        tracing::warn!("Coluna {} com tipo não numérico; tratada como nula", name);
        None
    }

    // date, timestamp, timestamptz ou texto; o que não parsear vira nulo
    fn date(&self, row: &PgRow, name: &str) -> Option<NaiveDate> {
        let idx = *self.positions.get(name)?;
        if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return v;
        }
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(|dt| dt.date());
        }
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(|dt| dt.date_naive());
        }
        row.try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .and_then(|s| parse_date_text(&s))
    }
}

fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    ["%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
