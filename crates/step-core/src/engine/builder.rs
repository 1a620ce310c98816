//! Builder de flujos.
//!
//! Compone la secuencia declarada de unidades de paso (función, triple
//! try/filter/catch, sub-flujo anidado, loop) en un único `Flow` invocable.
//! El builder se consume en cada encadenamiento y la definición resultante
//! es inmutable y reutilizable.
//!
//! Ejemplo de uso (comentario):
//!
//! ```ignore
//! // let flow = FlowBuilder::new()
//! //     .step(|ctx, args| { ... })
//! //     .step(|ctx, args| { ... })
//! //     .catch_filtered(ErrorFilter::code("EACCES"), |ctx, errors| { ... })
//! //     .build();
//! // let results = flow.call(vec![json!(1)]).await?;
//! ```

use std::sync::Arc;

use crate::catch::ErrorFilter;
use crate::config::EngineConfig;
use crate::engine::core::{CatchUnit, Flow, FlowInner, StepBody, StepUnit};
use crate::engine::ctx::StepCtx;
use crate::engine::loops::{LoopSpec, LoopUnit};
use crate::errors::{ErrorSet, FlowError};
use crate::model::{Args, StepReturn};

pub struct FlowBuilder {
    units: Vec<StepUnit>,
    config: EngineConfig,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    #[inline]
    pub fn new() -> Self {
        Self { units: Vec::new(),
               config: EngineConfig::default() }
    }

    /// Builder con configuración tomada del entorno (`STEPFLOW_*`).
    pub fn from_env() -> Self {
        Self { units: Vec::new(),
               config: EngineConfig::from_env() }
    }

    #[inline]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Añade un paso función.
    pub fn step<F, R>(mut self, body: F) -> Self
        where F: Fn(&mut StepCtx, Args) -> Result<R, FlowError> + Send + Sync + 'static,
              R: Into<StepReturn>
    {
        self.units.push(StepUnit { body: StepBody::Func(Arc::new(move |ctx, args| body(ctx, args).map(Into::into))),
                                   catch: None });
        self
    }

    /// Embebe otro flujo compilado como paso; el frame exterior trata su
    /// finalización como la resolución de un handle plano.
    pub fn subflow(mut self, flow: &Flow) -> Self {
        self.units.push(StepUnit { body: StepBody::SubFlow(flow.clone()),
                                   catch: None });
        self
    }

    /// Añade una unidad loop ya construida (permite capturar su label antes).
    pub fn repeat(mut self, unit: LoopUnit) -> Self {
        self.units.push(StepUnit { body: StepBody::Loop(unit),
                                   catch: None });
        self
    }

    /// Conveniencia: construye y añade la unidad loop en un solo paso.
    pub fn repeat_flow(self, flow: &Flow, spec: LoopSpec) -> Self {
        self.repeat(LoopUnit::new(flow.clone(), spec))
    }

    /// Adjunta un branch catch sin filtro a la última unidad añadida.
    pub fn catch<F, R>(self, handler: F) -> Self
        where F: Fn(&mut StepCtx, ErrorSet) -> Result<R, FlowError> + Send + Sync + 'static,
              R: Into<StepReturn>
    {
        self.attach_catch(None, handler)
    }

    /// Adjunta un branch catch filtrado: corre sólo si todos los errores del
    /// conjunto matchean el filtro.
    pub fn catch_filtered<F, R>(self, filter: ErrorFilter, handler: F) -> Self
        where F: Fn(&mut StepCtx, ErrorSet) -> Result<R, FlowError> + Send + Sync + 'static,
              R: Into<StepReturn>
    {
        self.attach_catch(Some(filter), handler)
    }

    fn attach_catch<F, R>(mut self, filter: Option<ErrorFilter>, handler: F) -> Self
        where F: Fn(&mut StepCtx, ErrorSet) -> Result<R, FlowError> + Send + Sync + 'static,
              R: Into<StepReturn>
    {
        debug_assert!(!self.units.is_empty(), "catch sin paso previo");
        if let Some(last) = self.units.last_mut() {
            debug_assert!(last.catch.is_none(), "la unidad ya tiene catch");
            last.catch = Some(CatchUnit { filter,
                                          handler: Arc::new(move |ctx, set| handler(ctx, set).map(Into::into)) });
        }
        self
    }

    /// Consume el builder y compila la definición inmutable.
    #[inline]
    pub fn build(self) -> Flow {
        Flow::new(FlowInner { units: self.units,
                              config: self.config })
    }
}
