//! Agregación y filtrado de errores por paso.
//!
//! Un paso declarado como triple [try, filter?, catch] evalúa su `ErrorSet`
//! así: sin filtro, el catch acepta cualquier conjunto no vacío; con filtro,
//! el catch corre sólo si TODOS los errores del conjunto matchean. Si alguno
//! no matchea, el catch se omite y ese primer error no-matcheante (en orden
//! de llegada) se convierte en el error propagado del paso.

use crate::errors::{ErrorSet, FlowError};

/// Filtro declarable en un triple try/filter/catch.
#[derive(Debug, Clone)]
pub enum ErrorFilter {
    /// Patrón contra el código categórico del error; si el error no lleva
    /// código, cae al contenido del mensaje.
    Code(String),
    /// Nombre de una propiedad explícita en `data`; matchea cuando existe y
    /// no es `null` ni `false`.
    Property(String),
}

impl ErrorFilter {
    pub fn code(pattern: impl Into<String>) -> Self {
        ErrorFilter::Code(pattern.into())
    }

    pub fn property(name: impl Into<String>) -> Self {
        ErrorFilter::Property(name.into())
    }

    pub fn matches(&self, error: &FlowError) -> bool {
        match self {
            ErrorFilter::Code(pattern) => match &error.code {
                Some(code) => code == pattern,
                None => error.message.contains(pattern.as_str()),
            },
            ErrorFilter::Property(name) => match error.data.get(name) {
                None => false,
                Some(value) => !value.is_null() && *value != serde_json::Value::Bool(false),
            },
        }
    }
}

/// Decisión del agregador para un conjunto no vacío.
pub(crate) enum CatchDecision {
    /// Todos los errores matchean (o no hay filtro): corre el catch.
    Run,
    /// El primer error no-matcheante en orden de llegada se propaga.
    Skip(FlowError),
}

pub(crate) fn evaluate(filter: Option<&ErrorFilter>, set: &ErrorSet) -> CatchDecision {
    let Some(filter) = filter else {
        return CatchDecision::Run;
    };
    match set.iter().find(|e| !filter.matches(e)) {
        None => CatchDecision::Run,
        Some(unmatched) => CatchDecision::Skip(unmatched.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_filter_falls_back_to_message() {
        let filter = ErrorFilter::code("EACCES");
        assert!(filter.matches(&FlowError::with_code("EACCES", "denied")));
        assert!(!filter.matches(&FlowError::with_code("ENOENT", "missing")));
        // sin código: el mensaje decide
        assert!(filter.matches(&FlowError::new("got EACCES from kernel")));
        assert!(!filter.matches(&FlowError::new("nothing to see")));
    }

    #[test]
    fn property_filter_requires_truthy_value() {
        let filter = ErrorFilter::property("retryable");
        let with = FlowError::new("boom").with_data(json!({"retryable": true}));
        let off = FlowError::new("boom").with_data(json!({"retryable": false}));
        let without = FlowError::new("boom");
        assert!(filter.matches(&with));
        assert!(!filter.matches(&off));
        assert!(!filter.matches(&without));
    }

    #[test]
    fn first_unmatched_in_arrival_order_propagates() {
        let mut set = ErrorSet::new();
        set.push(FlowError::with_code("EACCES", "a"));
        set.push(FlowError::with_code("ENOENT", "b"));
        set.push(FlowError::with_code("EPERM", "c"));
        match evaluate(Some(&ErrorFilter::code("EACCES")), &set) {
            CatchDecision::Skip(e) => assert_eq!(e.code.as_deref(), Some("ENOENT")),
            CatchDecision::Run => panic!("catch should be skipped"),
        }
    }
}
