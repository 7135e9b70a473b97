// src/common/response.rs

use serde::Serialize;

/// Resultado de uma escrita bem-sucedida cujos efeitos colaterais
/// (e-mail, integrações) podem ter falhado. A escrita nunca é desfeita;
/// as falhas viram avisos.
#[derive(Debug, Serialize)]
pub struct WithWarnings<T> {
    #[serde(flatten)]
    pub data: T,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> WithWarnings<T> {
    pub fn new(data: T) -> Self {
        Self { data, warnings: Vec::new() }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
