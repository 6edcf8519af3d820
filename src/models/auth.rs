// src/models/auth.rs

use serde::{Deserialize, Serialize};

// Valores do claim "role" que dão acesso total
const ADMIN_ROLES: [&str; 2] = ["ADM", "ADMIN"];

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (nome do usuário)
    pub role: String, // "ADM" ou o rótulo do gerente
    pub exp: usize,   // Expiration time (quando o token expira)
    pub iat: usize,   // Issued At (quando o token foi criado)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerRole {
    Admin,
    /// Gerente identificado pelo rótulo canônico.
    Manager(String),
}

impl CallerRole {
    pub fn from_claim(role: &str) -> Self {
        let trimmed = role.trim();
        if ADMIN_ROLES.iter().any(|adm| trimmed.eq_ignore_ascii_case(adm)) {
            CallerRole::Admin
        } else {
            CallerRole::Manager(trimmed.to_string())
        }
    }
}

/// Quem está pedindo o relatório.
#[derive(Debug, Clone)]
pub struct Caller {
    pub username: String,
    pub role: CallerRole,
}
