// src/db/source.rs

use async_trait::async_trait;

use crate::{common::error::AppError, models::commission::OperationSet};

/// Fonte das operações. Cada chamada lê tudo de novo; nada é guardado.
#[async_trait]
pub trait OperationSource: Send + Sync {
    async fn fetch_operations(&self) -> Result<OperationSet, AppError>;
}
