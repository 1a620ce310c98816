//! Adaptador de fuentes de eventos sin convención error-first.
//!
//! Acumula el valor líder de cada entrega en una lista creciente hasta que un
//! handle terminal distinto se invoque una única vez; el slot ligado recibe
//! entonces la lista completa. Un canal de error opcional marca la rama como
//! fallida en su lugar.

use std::sync::{Arc, Mutex};

use log::warn;
use serde_json::Value;

use crate::errors::FlowError;
use crate::frame::{Binding, FrameShared};

use super::HandleState;

/// Par acumulación/terminal para una fuente de eventos.
///
/// `emit` admite cualquier número de invocaciones (orden de llegada);
/// `close` y `fail` comparten la disciplina de un solo uso del terminal.
#[derive(Clone)]
pub struct EventAdapter {
    frame: Arc<FrameShared>,
    binding: Binding,
    items: Arc<Mutex<Vec<Value>>>,
    terminal: Arc<Mutex<HandleState>>,
}

impl EventAdapter {
    pub(crate) fn new(frame: Arc<FrameShared>, binding: Binding) -> Self {
        Self { frame,
               binding,
               items: Arc::new(Mutex::new(Vec::new())),
               terminal: Arc::new(Mutex::new(HandleState::Pending)) }
    }

    /// Registra una ocurrencia del evento: apila su valor líder.
    pub fn emit(&self, value: Value) {
        let mut items = self.items.lock().expect("adapter items poisoned");
        items.push(value);
    }

    /// Terminal de éxito: resuelve el slot con la lista acumulada.
    pub fn close(&self) {
        if !self.acquire_terminal() {
            return;
        }
        let items = {
            let mut items = self.items.lock().expect("adapter items poisoned");
            std::mem::take(&mut *items)
        };
        self.frame.fill(self.binding, vec![Value::Array(items)]);
        self.frame.release();
    }

    /// Canal de error dedicado: marca la rama como fallida y descarta lo
    /// acumulado.
    pub fn fail(&self, error: FlowError) {
        if !self.acquire_terminal() {
            return;
        }
        self.frame.push_error(error);
        self.frame.release();
    }

    fn acquire_terminal(&self) -> bool {
        let mut state = self.terminal.lock().expect("adapter terminal poisoned");
        match *state {
            HandleState::Pending => {
                *state = HandleState::Resolved;
                true
            }
            _ => {
                *state = HandleState::Misused;
                drop(state);
                warn!("frame {}: event adapter terminal re-invoked (misuse)", self.frame.id);
                if self.frame.config.strict_handles {
                    panic!("stepflow: event adapter terminal re-invoked");
                }
                false
            }
        }
    }
}
