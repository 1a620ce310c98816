//! Handles de finalización: tokens de un solo uso creados durante un paso.
//!
//! Un handle queda ligado a un slot plano o a una fila (grupo, índice) de su
//! frame. Estados y transiciones válidas:
//! - `Pending` -> `Resolved` (primera invocación)
//! - `Resolved` -> `Misused` (re-invocación detectada)
//!
//! No se permiten reversiones o saltos arbitrarios entre estados.
//!
//! Una re-invocación se registra como mal uso y no corrompe el estado del
//! frame; con `strict_handles` activo provoca pánico.

pub(crate) mod adapter;

use std::sync::{Arc, Mutex};

use log::warn;
use serde_json::Value;

use crate::engine::Flow;
use crate::errors::FlowError;
use crate::frame::{Binding, FrameShared};
use crate::model::Args;

/// Estado explícito por handle (no una bandera de clausura).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleState {
    Pending,
    Resolved,
    Misused,
}

/// Transformación aplicada a una resolución exitosa antes de almacenarla.
pub(crate) enum Fixup {
    Transform(Arc<dyn Fn(Value) -> Result<Value, FlowError> + Send + Sync>),
    Flow(Flow),
}

/// Token de finalización de una rama asíncrona.
///
/// Clonable para poder entregarse a tareas externas; todos los clones
/// comparten el mismo estado de un-solo-uso.
#[derive(Clone)]
pub struct Handle {
    frame: Arc<FrameShared>,
    binding: Binding,
    state: Arc<Mutex<HandleState>>,
    fixup: Option<Arc<Fixup>>,
}

impl Handle {
    pub(crate) fn new(frame: Arc<FrameShared>, binding: Binding, fixup: Option<Fixup>) -> Self {
        Self { frame,
               binding,
               state: Arc::new(Mutex::new(HandleState::Pending)),
               fixup: fixup.map(Arc::new) }
    }

    /// Contrato de finalización `(error, ...values)`: un `Err` marca la rama
    /// como fallida y entra al `ErrorSet` del frame; un `Ok` almacena los
    /// valores en el slot o fila ligados.
    pub fn complete(&self, result: Result<Args, FlowError>) {
        if !self.acquire() {
            return;
        }
        match (&self.fixup, result) {
            (None, Ok(values)) => {
                self.frame.fill(self.binding, values);
                self.frame.release();
            }
            (Some(fixup), Ok(values)) => self.apply_fixup(fixup.clone(), values),
            (_, Err(error)) => {
                self.frame.push_error(error);
                self.frame.release();
            }
        }
    }

    /// Resuelve con un único valor.
    pub fn ok(&self, value: Value) {
        self.complete(Ok(vec![value]));
    }

    /// Resuelve con varios valores posicionales.
    pub fn ok_many(&self, values: Args) {
        self.complete(Ok(values));
    }

    /// Resuelve sin valores (aporta un ausente explícito al ensamblar).
    pub fn done(&self) {
        self.complete(Ok(Vec::new()));
    }

    /// Marca la rama como fallida.
    pub fn err(&self, error: FlowError) {
        self.complete(Err(error));
    }

    /// Transición `Pending -> Resolved`; cualquier otra cosa es mal uso.
    fn acquire(&self) -> bool {
        let mut state = self.state.lock().expect("handle state poisoned");
        match *state {
            HandleState::Pending => {
                *state = HandleState::Resolved;
                true
            }
            HandleState::Resolved | HandleState::Misused => {
                *state = HandleState::Misused;
                drop(state);
                warn!("frame {}: handle re-invoked after resolution (misuse)", self.frame.id);
                if self.frame.config.strict_handles {
                    panic!("stepflow: handle re-invoked after resolution");
                }
                false
            }
        }
    }

    fn apply_fixup(&self, fixup: Arc<Fixup>, values: Args) {
        match fixup.as_ref() {
            Fixup::Transform(transform) => {
                let input = values.into_iter().next().unwrap_or(Value::Null);
                // Un error de la transformación entra al ErrorSet del frame
                // actual, no al de ningún ancestro.
                match transform(input) {
                    Ok(value) => self.frame.fill(self.binding, vec![value]),
                    Err(error) => self.frame.push_error(error),
                }
                self.frame.release();
            }
            Fixup::Flow(flow) => {
                // El almacenamiento se difiere hasta que el sub-flujo
                // resuelva; la unidad pendiente se retiene mientras tanto.
                let frame = self.frame.clone();
                let binding = self.binding;
                let flow = flow.clone();
                self.frame.defer(Box::pin(async move {
                    match flow.call(values).await {
                        Ok(out) => frame.fill(binding, out),
                        Err(error) => frame.push_error(error),
                    }
                    frame.release();
                }));
            }
        }
    }
}

/// Grupo dinámico: fabrica handles ligados a filas consecutivas.
pub struct Group {
    frame: Arc<FrameShared>,
    id: usize,
}

impl Group {
    pub(crate) fn new(frame: Arc<FrameShared>, id: usize) -> Self {
        Self { frame, id }
    }

    /// Crea el handle de la siguiente fila del grupo. El orden de creación
    /// fija el índice de fila, independiente del orden de finalización.
    pub fn handle(&mut self) -> Handle {
        let row = self.frame.declare_group_row(self.id);
        Handle::new(self.frame.clone(), Binding::Group { group: self.id, row }, None)
    }
}
