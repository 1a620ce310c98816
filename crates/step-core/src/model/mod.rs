//! Valores posicionales intercambiados entre pasos.
//!
//! El motor es neutral respecto al contenido: cada argumento es un
//! `serde_json::Value` y la lista de argumentos de un paso es un `Args`.
//! La ausencia de valor es siempre un marcador explícito (`Value::Null`),
//! nunca un índice omitido.

use serde_json::Value;

/// Lista posicional de argumentos que recibe (y produce) un paso.
pub type Args = Vec<Value>;

/// Marcador explícito de "ausente" usado al rellenar filas de grupo y slots
/// resueltos sin valores.
pub fn absent() -> Value {
    Value::Null
}

/// Contribución síncrona del cuerpo de un paso.
///
/// - `Value` se convierte en el único argumento siguiente.
/// - `Spread` expande sus elementos como argumentos individuales.
/// - `None` no aporta nada; los handles creados (si los hay) deciden.
///
/// Si el cuerpo además creó handles, la contribución síncrona precede a los
/// slots de esos handles en la lista del paso siguiente.
#[derive(Debug, Clone)]
pub enum StepReturn {
    None,
    Value(Value),
    Spread(Args),
}

impl StepReturn {
    pub(crate) fn into_args(self) -> Args {
        match self {
            StepReturn::None => Vec::new(),
            StepReturn::Value(v) => vec![v],
            StepReturn::Spread(vs) => vs,
        }
    }
}

impl From<Value> for StepReturn {
    fn from(v: Value) -> Self {
        StepReturn::Value(v)
    }
}

impl From<Args> for StepReturn {
    fn from(vs: Args) -> Self {
        StepReturn::Spread(vs)
    }
}

impl From<()> for StepReturn {
    fn from(_: ()) -> Self {
        StepReturn::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_return_into_args_shapes() {
        assert!(StepReturn::None.into_args().is_empty());
        assert_eq!(StepReturn::Value(json!(7)).into_args(), vec![json!(7)]);
        assert_eq!(StepReturn::Spread(vec![json!(1), json!(2)]).into_args(),
                   vec![json!(1), json!(2)]);
    }
}
