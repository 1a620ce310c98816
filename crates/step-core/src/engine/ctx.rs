//! Contexto explícito de paso.
//!
//! Cada cuerpo de paso, catch o iteración recibe un `StepCtx`; la creación de
//! handles es una operación sobre ese contexto, nunca estado ambiente o
//! global. El contexto expone además el alcance del loop propietario (índice
//! de iteración y salida explícita) cuando el paso corre dentro de uno.

use std::sync::Arc;

use serde_json::Value;

use crate::engine::loops::LoopScope;
use crate::engine::Flow;
use crate::errors::FlowError;
use crate::frame::{Binding, FrameShared};
use crate::handle::adapter::EventAdapter;
use crate::handle::{Fixup, Group, Handle};
use crate::model::Args;

pub struct StepCtx {
    frame: Arc<FrameShared>,
    scope: Option<LoopScope>,
}

impl StepCtx {
    pub(crate) fn new(frame: Arc<FrameShared>, scope: Option<LoopScope>) -> Self {
        Self { frame, scope }
    }

    /// Handle plano: un slot de resultado. El orden de creación fija la
    /// posición del slot en los argumentos del paso siguiente.
    #[inline]
    pub fn handle(&mut self) -> Handle {
        let slot = self.frame.declare_slot();
        Handle::new(self.frame.clone(), Binding::Slot(slot), None)
    }

    /// Grupo dinámico nuevo ("arrays as you go"): aporta un único argumento
    /// con su array de filas.
    pub fn group(&mut self) -> Group {
        let id = self.frame.declare_group();
        Group::new(self.frame.clone(), id)
    }

    /// Adaptador para fuentes de eventos sin convención error-first.
    pub fn event_adapter(&mut self) -> EventAdapter {
        let slot = self.frame.declare_slot();
        EventAdapter::new(self.frame.clone(), Binding::Slot(slot))
    }

    /// Handle fixup: aplica `transform` al valor exitoso antes de almacenar.
    /// Un error de la transformación entra al `ErrorSet` del frame actual.
    pub fn fixup<F>(&mut self, transform: F) -> Handle
        where F: Fn(Value) -> Result<Value, FlowError> + Send + Sync + 'static
    {
        let slot = self.frame.declare_slot();
        Handle::new(self.frame.clone(),
                    Binding::Slot(slot),
                    Some(Fixup::Transform(Arc::new(transform))))
    }

    /// Handle fixup cuya transformación es un sub-flujo anidado: el
    /// almacenamiento se difiere hasta que ese sub-flujo resuelva.
    pub fn fixup_flow(&mut self, flow: &Flow) -> Handle {
        let slot = self.frame.declare_slot();
        Handle::new(self.frame.clone(), Binding::Slot(slot), Some(Fixup::Flow(flow.clone())))
    }

    /// Embebe la invocación de otro flujo compilado como rama concurrente del
    /// frame actual; su finalización se trata exactamente como la resolución
    /// de un handle plano.
    pub fn subflow(&mut self, flow: &Flow, args: Args) {
        let handle = self.handle();
        let flow = flow.clone();
        self.frame.defer(Box::pin(async move {
            handle.complete(flow.call(args).await);
        }));
    }

    /// Índice de iteración (base cero) si el paso corre dentro de un loop.
    #[inline]
    pub fn iteration(&self) -> Option<usize> {
        self.scope.as_ref().map(|s| s.index)
    }

    /// Salida explícita del loop propietario con `(error, result)`.
    /// Devuelve `false` si el paso no corre dentro de un loop.
    pub fn exit_loop(&self, result: Result<Args, FlowError>) -> bool {
        match &self.scope {
            Some(scope) => scope.exit.send(result).is_ok(),
            None => false,
        }
    }
}
