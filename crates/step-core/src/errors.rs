//! Errores del motor: valor de error de rama (`FlowError`) y el conjunto
//! ordenado por llegada (`ErrorSet`) de un paso.
//!
//! Rol en el flujo:
//! - Cada rama concurrente que falla aporta un `FlowError` al `ErrorSet` del
//!   frame en curso, en orden de llegada.
//! - Un branch catch consume el conjunto completo; sin catch, el conjunto se
//!   reduce a exactamente un error reportado. Nunca se descarta un conjunto
//!   en silencio.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Código reservado para un frame que nunca resuelve bajo `stall_timeout`.
pub const STALL_CODE: &str = "ESTALL";

/// Valor de error intercambiado entre ramas, pasos y el caller externo.
///
/// - `code` es la categoría estable (p.ej. `EACCES`) usada por los filtros de
///   catch; puede faltar, en cuyo caso el filtro cae al `message`.
/// - `data` lleva propiedades auxiliares inspeccionables por
///   `ErrorFilter::Property`. No entra en el `Display`.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct FlowError {
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl FlowError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None,
               message: message.into(),
               data: Value::Null }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()),
               message: message.into(),
               data: Value::Null }
    }

    /// Adjunta propiedades auxiliares (consumidor típico: filtros de catch).
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Fallo sintético emitido cuando un frame supera el `stall_timeout`
    /// configurado sin resolver todos sus handles.
    pub(crate) fn stalled() -> Self {
        Self::with_code(STALL_CODE, "step frame stalled: unresolved handles outlived the stall timeout")
    }
}

impl From<String> for FlowError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FlowError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Conjunto ordenado-por-llegada de errores de las ramas concurrentes de un
/// paso. El orden es de llegada (resolución), no de declaración.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSet {
    errors: Vec<FlowError>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn single(error: FlowError) -> Self {
        Self { errors: vec![error] }
    }

    pub(crate) fn push(&mut self, error: FlowError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Primer error en orden de llegada (conveniencia para branches catch).
    pub fn first(&self) -> Option<&FlowError> {
        self.errors.first()
    }

    pub fn get(&self, index: usize) -> Option<&FlowError> {
        self.errors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlowError> {
        self.errors.iter()
    }

    pub fn as_slice(&self) -> &[FlowError] {
        &self.errors
    }

    /// Reduce el conjunto al único error reportado hacia afuera: el primero
    /// en llegar. `None` sólo si el conjunto está vacío.
    pub fn into_reported(mut self) -> Option<FlowError> {
        if self.errors.is_empty() {
            return None;
        }
        Some(self.errors.remove(0))
    }

    pub fn into_vec(self) -> Vec<FlowError> {
        self.errors
    }
}

impl std::fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.first() {
            None => write!(f, "empty error set"),
            Some(first) if self.errors.len() == 1 => write!(f, "{first}"),
            Some(first) => write!(f, "{first} (+{} concurrent)", self.errors.len() - 1),
        }
    }
}

impl IntoIterator for ErrorSet {
    type Item = FlowError;
    type IntoIter = std::vec::IntoIter<FlowError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a FlowError;
    type IntoIter = std::slice::Iter<'a, FlowError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
