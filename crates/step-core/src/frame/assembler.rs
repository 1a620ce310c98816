//! Ensamblado de resultados: construye la lista de argumentos del paso
//! siguiente a partir de un frame resuelto.
//!
//! Orden de concatenación:
//! 1. contribución síncrona del cuerpo (si retornó valores),
//! 2. slots planos en orden de declaración (los valores de cada handle se
//!    concatenan; una resolución sin valores aporta un ausente explícito),
//! 3. un argumento por grupo: su array de filas, reconciliado al ancho
//!    máximo observado con relleno de ausentes.

use serde_json::Value;

use crate::model::{absent, Args};

use super::{FrameParts, GroupRows};

/// Produce los argumentos del paso siguiente. Sólo debe invocarse con un
/// `ErrorSet` vacío; con errores el control pasa al agregador.
pub(crate) fn assemble(parts: FrameParts) -> Args {
    debug_assert!(parts.errors.is_empty(), "assemble con errores pendientes");

    let mut next = parts.sync_return;

    for slot in parts.slots {
        match slot {
            Some(values) if values.is_empty() => next.push(absent()),
            Some(values) => next.extend(values),
            // Rama fallida o descartada: nunca un índice omitido.
            None => next.push(absent()),
        }
    }

    for group in parts.groups {
        next.push(group_argument(group));
    }

    next
}

/// Array de filas de un grupo con ancho uniforme.
///
/// Un grupo sin filas declaradas produce una única fila de aridad 1 con un
/// ausente explícito: nunca un resultado de longitud cero.
fn group_argument(group: GroupRows) -> Value {
    let GroupRows { mut rows, arity } = group;
    if rows.is_empty() {
        rows.push(None);
    }
    let width = arity.max(1);

    let assembled: Vec<Value> = rows.into_iter()
                                    .map(|row| {
                                        let mut cells = row.unwrap_or_default();
                                        cells.resize(width, absent());
                                        Value::Array(cells)
                                    })
                                    .collect();
    Value::Array(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorSet;
    use serde_json::json;

    fn parts(sync_return: Args, slots: Vec<Option<Args>>, groups: Vec<GroupRows>) -> FrameParts {
        FrameParts { sync_return,
                     slots,
                     groups,
                     errors: ErrorSet::new() }
    }

    #[test]
    fn sync_return_precedes_slots() {
        let next = assemble(parts(vec![json!("ret")], vec![Some(vec![json!("slot")])], vec![]));
        assert_eq!(next, vec![json!("ret"), json!("slot")]);
    }

    #[test]
    fn empty_group_yields_one_absent_row() {
        let next = assemble(parts(vec![], vec![], vec![GroupRows::default()]));
        assert_eq!(next, vec![json!([[null]])]);
    }

    #[test]
    fn group_rows_pad_to_max_arity() {
        let mut g = GroupRows::default();
        let r0 = g.declare_row();
        let r1 = g.declare_row();
        g.fill_row(r0, vec![json!(1)]);
        g.fill_row(r1, vec![json!(1), json!(2), json!(3)]);
        let next = assemble(parts(vec![], vec![], vec![g]));
        assert_eq!(next, vec![json!([[1, null, null], [1, 2, 3]])]);
    }

    #[test]
    fn empty_resolution_contributes_explicit_absent() {
        let next = assemble(parts(vec![], vec![Some(vec![])], vec![]));
        assert_eq!(next, vec![json!(null)]);
    }
}
