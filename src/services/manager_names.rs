// src/services/manager_names.rs

use std::{collections::HashMap, path::Path};

use serde::Deserialize;

use crate::{common::error::AppError, models::commission::OperationRecord};

// Formato do arquivo config/manager_mapping.json
#[derive(Debug, Deserialize)]
struct MappingFile {
    version: String,
    mapping: HashMap<String, String>,
}

/// Tabela de nomes de gerente: rótulo bruto -> rótulo canônico.
///
/// As chaves ficam guardadas já aparadas e em maiúsculas. A tabela é
/// idempotente: nenhum rótulo canônico normaliza para outro rótulo.
#[derive(Debug, Clone)]
pub struct ManagerNameMapping {
    version: String,
    entries: HashMap<String, String>,
}

impl ManagerNameMapping {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::MappingConfig(format!("não foi possível ler {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let file: MappingFile = serde_json::from_str(raw)
            .map_err(|e| AppError::MappingConfig(format!("JSON inválido: {}", e)))?;
        Self::new(file.version, file.mapping)
    }

    pub fn new(
        version: impl Into<String>,
        mapping: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, AppError> {
        let mut entries = HashMap::new();
        for (raw, canonical) in mapping {
            let key = match_key(&raw);
            if let Some(previous) = entries.insert(key.clone(), canonical.clone()) {
                if previous != canonical {
                    return Err(AppError::MappingConfig(format!(
                        "'{}' aparece duas vezes com destinos diferentes ('{}' e '{}')",
                        key, previous, canonical
                    )));
                }
            }
        }

        // Um destino não pode ser chave de outro destino
        for canonical in entries.values() {
            if let Some(next) = entries.get(&match_key(canonical)) {
                if next != canonical {
                    return Err(AppError::MappingConfig(format!(
                        "'{}' é rótulo canônico mas também normaliza para '{}'",
                        canonical, next
                    )));
                }
            }
        }

        Ok(Self { version: version.into(), entries })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Rótulo canônico. Sem correspondência, devolve a entrada como veio.
    pub fn normalize(&self, label: &str) -> String {
        self.entries
            .get(&match_key(label))
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    /// Nulo passa direto.
    pub fn normalize_opt(&self, label: Option<&str>) -> Option<String> {
        label.map(|l| self.normalize(l))
    }

    pub fn apply(&self, records: Vec<OperationRecord>) -> Vec<OperationRecord> {
        records
            .into_iter()
            .map(|mut record| {
                record.gerente = self.normalize_opt(record.gerente.as_deref());
                record
            })
            .collect()
    }
}

fn match_key(label: &str) -> String {
    label.trim().to_uppercase()
}
