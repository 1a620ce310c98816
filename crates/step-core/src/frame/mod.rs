//! Frame de paso: estado de runtime de una ejecución de paso en curso.
//!
//! Un frame es propiedad exclusiva de una invocación en vuelo. Mantiene:
//! - el contador de handles pendientes,
//! - los slots de resultado en orden de declaración,
//! - las filas dinámicas por grupo,
//! - el `ErrorSet` creciente del paso,
//! - las ramas diferidas (sub-flujos embebidos, transformaciones fixup) que el
//!   motor conduce desde su único punto de espera.
//!
//! Invariante central: el frame avanza sólo cuando `pending == 0` y el cuerpo
//! del paso ya retornó. La posición de slots y filas la fija el orden de
//! declaración, nunca el orden de finalización.

pub(crate) mod assembler;

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::errors::{ErrorSet, FlowError};
use crate::model::Args;

/// Destino de un handle: slot plano o fila (grupo, índice).
#[derive(Debug, Clone, Copy)]
pub(crate) enum Binding {
    Slot(usize),
    Group { group: usize, row: usize },
}

/// Filas dinámicas de un grupo ("arrays as you go").
///
/// `arity` registra el ancho máximo observado; la reconciliación al ancho
/// uniforme (relleno con ausentes) ocurre en el ensamblado.
#[derive(Debug, Default)]
pub(crate) struct GroupRows {
    pub(crate) rows: Vec<Option<Args>>,
    pub(crate) arity: usize,
}

impl GroupRows {
    fn declare_row(&mut self) -> usize {
        self.rows.push(None);
        self.rows.len() - 1
    }

    fn fill_row(&mut self, row: usize, values: Args) {
        self.arity = self.arity.max(values.len()).max(1);
        if let Some(slot) = self.rows.get_mut(row) {
            *slot = Some(values);
        }
    }
}

#[derive(Default)]
pub(crate) struct FrameInner {
    pending: usize,
    body_returned: bool,
    sync_return: Args,
    slots: Vec<Option<Args>>,
    groups: Vec<GroupRows>,
    errors: ErrorSet,
    deferred: Vec<BoxFuture<'static, ()>>,
}

/// Partes consumidas del frame una vez resuelto, listas para ensamblar.
pub(crate) struct FrameParts {
    pub(crate) sync_return: Args,
    pub(crate) slots: Vec<Option<Args>>,
    pub(crate) groups: Vec<GroupRows>,
    pub(crate) errors: ErrorSet,
}

/// Estado compartido entre el motor, los handles y las ramas diferidas.
pub(crate) struct FrameShared {
    pub(crate) id: Uuid,
    pub(crate) config: EngineConfig,
    inner: Mutex<FrameInner>,
    notify: Notify,
}

impl FrameShared {
    pub(crate) fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self { id: Uuid::new_v4(),
                        config,
                        inner: Mutex::new(FrameInner::default()),
                        notify: Notify::new() })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrameInner> {
        // Un poison aquí implica pánico en sección crítica propia; no hay
        // recuperación razonable.
        self.inner.lock().expect("frame state poisoned")
    }

    /// Declara un slot plano. El orden de llamada fija la posición.
    pub(crate) fn declare_slot(&self) -> usize {
        let mut inner = self.lock();
        inner.pending += 1;
        inner.slots.push(None);
        inner.slots.len() - 1
    }

    /// Declara un grupo dinámico vacío.
    pub(crate) fn declare_group(&self) -> usize {
        let mut inner = self.lock();
        inner.groups.push(GroupRows::default());
        inner.groups.len() - 1
    }

    /// Declara la siguiente fila de un grupo. El índice de fila queda fijado
    /// por el orden de declaración.
    pub(crate) fn declare_group_row(&self, group: usize) -> usize {
        let mut inner = self.lock();
        inner.pending += 1;
        inner.groups[group].declare_row()
    }

    /// Almacena los valores de una rama resuelta en su destino.
    pub(crate) fn fill(&self, binding: Binding, values: Args) {
        let mut inner = self.lock();
        match binding {
            Binding::Slot(index) => {
                if let Some(slot) = inner.slots.get_mut(index) {
                    *slot = Some(values);
                }
            }
            Binding::Group { group, row } => {
                if let Some(rows) = inner.groups.get_mut(group) {
                    rows.fill_row(row, values);
                }
            }
        }
    }

    /// Registra el fallo de una rama en el `ErrorSet` del frame, en orden de
    /// llegada. El slot asociado queda sin valor (se descarta al reportar).
    pub(crate) fn push_error(&self, error: FlowError) {
        let mut inner = self.lock();
        debug!("frame {}: branch error captured: {}", self.id, error);
        inner.errors.push(error);
    }

    /// Libera una unidad pendiente. Despierta al motor si el frame quedó
    /// resuelto.
    pub(crate) fn release(&self) {
        let settled = {
            let mut inner = self.lock();
            debug_assert!(inner.pending > 0, "release sin pendiente");
            inner.pending = inner.pending.saturating_sub(1);
            inner.pending == 0 && inner.body_returned
        };
        if settled {
            self.notify.notify_one();
        }
    }

    /// Encola una rama diferida que el motor conducirá desde `settle`.
    pub(crate) fn defer(&self, fut: BoxFuture<'static, ()>) {
        {
            let mut inner = self.lock();
            inner.deferred.push(fut);
        }
        self.notify.notify_one();
    }

    pub(crate) fn set_sync_return(&self, values: Args) {
        let mut inner = self.lock();
        inner.sync_return = values;
    }

    /// Marca que el cuerpo del paso retornó; desde aquí el frame puede
    /// resolverse en cuanto `pending` llegue a cero.
    pub(crate) fn mark_body_returned(&self) {
        let mut inner = self.lock();
        inner.body_returned = true;
    }

    fn is_settled(&self) -> bool {
        let inner = self.lock();
        inner.body_returned && inner.pending == 0
    }

    fn take_deferred(&self) -> Vec<BoxFuture<'static, ()>> {
        let mut inner = self.lock();
        std::mem::take(&mut inner.deferred)
    }

    /// Consume el estado del frame resuelto.
    pub(crate) fn into_parts(&self) -> FrameParts {
        let mut inner = self.lock();
        FrameParts { sync_return: std::mem::take(&mut inner.sync_return),
                     slots: std::mem::take(&mut inner.slots),
                     groups: std::mem::take(&mut inner.groups),
                     errors: std::mem::take(&mut inner.errors) }
    }

    /// Conduce las ramas diferidas y espera a que el frame quede resuelto.
    ///
    /// Las ramas propias del motor (sub-flujos embebidos, fixups con flujo
    /// anidado) se conducen aquí, desde un único punto de espera; los handles
    /// externos despiertan esta espera vía `release`. Con `stall_timeout`
    /// configurado, un frame que nunca resuelve se convierte en `ESTALL`.
    pub(crate) async fn settle(self: &Arc<Self>) -> Result<(), FlowError> {
        match self.config.stall_timeout {
            None => {
                self.settle_inner().await;
                Ok(())
            }
            Some(limit) => match tokio::time::timeout(limit, self.settle_inner()).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    log::warn!("frame {}: stalled past {:?}", self.id, limit);
                    Err(FlowError::stalled())
                }
            },
        }
    }

    async fn settle_inner(self: &Arc<Self>) {
        let mut branches: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();
        loop {
            for fut in self.take_deferred() {
                branches.push(fut);
            }
            if self.is_settled() {
                debug!("frame {}: settled", self.id);
                return;
            }
            if branches.is_empty() {
                self.notify.notified().await;
            } else {
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = branches.next() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declaration_order_fixes_slot_positions() {
        let frame = FrameShared::new(EngineConfig::default());
        let a = frame.declare_slot();
        let b = frame.declare_slot();
        assert_eq!((a, b), (0, 1));

        // resolución en orden inverso al de declaración
        frame.fill(Binding::Slot(b), vec![json!("second")]);
        frame.fill(Binding::Slot(a), vec![json!("first")]);
        frame.release();
        frame.release();

        let parts = frame.into_parts();
        assert_eq!(parts.slots[0], Some(vec![json!("first")]));
        assert_eq!(parts.slots[1], Some(vec![json!("second")]));
    }

    #[test]
    fn group_rows_track_max_arity() {
        let mut rows = GroupRows::default();
        let r0 = rows.declare_row();
        let r1 = rows.declare_row();
        rows.fill_row(r0, vec![json!(1)]);
        rows.fill_row(r1, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(rows.arity, 3);
    }
}
