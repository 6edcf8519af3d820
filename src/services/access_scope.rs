// src/services/access_scope.rs

use crate::models::{auth::CallerRole, commission::OperationRecord};

/// Restringe os registros ao gerente de quem chama. Admin vê tudo.
///
/// Roda depois da normalização: tanto `gerente` quanto o rótulo do papel
/// chegam aqui em forma canônica.
pub fn scope(records: Vec<OperationRecord>, role: &CallerRole) -> Vec<OperationRecord> {
    match role {
        CallerRole::Admin => records,
        CallerRole::Manager(label) => records
            .into_iter()
            .filter(|r| r.gerente.as_deref() == Some(label.as_str()))
            .collect(),
    }
}
