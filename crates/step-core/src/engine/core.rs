//! Núcleo del motor: el flujo compilado y su driver por pasos.
//!
//! Un `Flow` es la secuencia inmutable de unidades de paso compilada por el
//! builder. Invocarlo crea, paso a paso, un frame por ejecución de cuerpo;
//! cuando el frame resuelve (pendientes en cero y cuerpo retornado), el
//! ensamblador o el agregador de errores deciden las entradas del paso
//! siguiente. La definición no guarda estado mutable por invocación y puede
//! reutilizarse concurrentemente.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::debug;
use uuid::Uuid;

use crate::catch::{self, CatchDecision, ErrorFilter};
use crate::config::EngineConfig;
use crate::engine::ctx::StepCtx;
use crate::engine::loops::{self, LoopScope, LoopUnit};
use crate::errors::{ErrorSet, FlowError};
use crate::frame::{assembler, FrameShared};
use crate::model::{Args, StepReturn};

/// Cuerpo de paso: recibe el contexto explícito y los argumentos
/// posicionales del paso anterior.
pub type StepFn = Arc<dyn Fn(&mut StepCtx, Args) -> Result<StepReturn, FlowError> + Send + Sync>;

/// Cuerpo de catch: recibe el `ErrorSet` completo del paso fallido.
pub type CatchFn = Arc<dyn Fn(&mut StepCtx, ErrorSet) -> Result<StepReturn, FlowError> + Send + Sync>;

pub(crate) enum StepBody {
    Func(StepFn),
    SubFlow(Flow),
    Loop(LoopUnit),
}

pub(crate) struct CatchUnit {
    pub(crate) filter: Option<ErrorFilter>,
    pub(crate) handler: CatchFn,
}

pub(crate) struct StepUnit {
    pub(crate) body: StepBody,
    pub(crate) catch: Option<CatchUnit>,
}

pub(crate) struct FlowInner {
    pub(crate) units: Vec<StepUnit>,
    pub(crate) config: EngineConfig,
}

/// Flujo compilado: una única operación asíncrona componible.
#[derive(Clone)]
pub struct Flow {
    inner: Arc<FlowInner>,
}

impl Flow {
    pub(crate) fn new(inner: FlowInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub fn len(&self) -> usize {
        self.inner.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.units.is_empty()
    }

    /// Punto de entrada del flujo compilado: `call(args)` resuelve exactamente
    /// una vez, error-first por construcción (la forma Rust del contrato
    /// `invoke(...args, done)`).
    pub async fn call(&self, args: Args) -> Result<Args, FlowError> {
        self.call_scoped(args, None).await
    }

    /// Invocación con el alcance de loop del propietario (si existe). Los
    /// sub-flujos anidados heredan el alcance; los loops crean el suyo.
    pub(crate) fn call_scoped(&self, args: Args, scope: Option<LoopScope>) -> BoxFuture<'static, Result<Args, FlowError>> {
        let flow = self.clone();
        Box::pin(async move {
            let invocation = Uuid::new_v4();
            let mut args = args;
            for index in 0..flow.inner.units.len() {
                let unit = &flow.inner.units[index];
                debug!("flow {invocation}: step {index} start");
                match run_unit(&flow.inner.config, unit, args, scope.clone()).await {
                    Ok(next) => args = next,
                    Err(set) => {
                        debug!("flow {invocation}: step {index} failed with {} error(s)", set.len());
                        match &unit.catch {
                            None => {
                                // Sin catch: el primer error en llegar es el
                                // único reportado; el resto se descarta ya
                                // drenado.
                                return Err(set.into_reported()
                                              .unwrap_or_else(|| FlowError::new("step failed with empty error set")));
                            }
                            Some(catch_unit) => match catch::evaluate(catch_unit.filter.as_ref(), &set) {
                                CatchDecision::Skip(unmatched) => return Err(unmatched),
                                CatchDecision::Run => {
                                    // Un error del propio catch re-lanza hacia
                                    // afuera: incapturable dentro de este
                                    // flujo, capturable por uno envolvente.
                                    args = run_catch(&flow.inner.config, catch_unit, set, scope.clone()).await?;
                                }
                            },
                        }
                    }
                }
            }
            debug!("flow {invocation}: completed");
            Ok(args)
        })
    }
}

/// Corre una unidad y produce las entradas del paso siguiente o el
/// `ErrorSet` del paso.
async fn run_unit(config: &EngineConfig, unit: &StepUnit, args: Args, scope: Option<LoopScope>) -> Result<Args, ErrorSet> {
    match &unit.body {
        StepBody::Func(body) => run_func(config, body, args, scope).await,
        StepBody::SubFlow(sub) => sub.call_scoped(args, scope).await.map_err(ErrorSet::single),
        StepBody::Loop(looped) => loops::drive(looped, args).await.map_err(ErrorSet::single),
    }
}

/// Ejecuta un cuerpo de función con su propio frame y espera la resolución
/// completa (todas las ramas drenan, incluso tras un fallo).
async fn run_func(config: &EngineConfig, body: &StepFn, args: Args, scope: Option<LoopScope>) -> Result<Args, ErrorSet> {
    let frame = FrameShared::new(config.clone());
    let mut ctx = StepCtx::new(frame.clone(), scope);

    match body(&mut ctx, args) {
        // La contribución síncrona precede a los slots de handles.
        Ok(ret) => frame.set_sync_return(ret.into_args()),
        // Un fallo síncrono es un fallo de rama inmediato del frame actual.
        Err(error) => frame.push_error(error),
    }
    drop(ctx);
    frame.mark_body_returned();

    if let Err(stall) = frame.settle().await {
        let mut errors = frame.into_parts().errors;
        errors.push(stall);
        return Err(errors);
    }

    let parts = frame.into_parts();
    if parts.errors.is_empty() {
        Ok(assembler::assemble(parts))
    } else {
        // Éxitos parciales de ramas hermanas se descartan: sólo el ErrorSet
        // llega al catch (o al agregador).
        Err(parts.errors)
    }
}

/// Ejecuta el cuerpo de catch en su propio frame, como en la ruta de éxito.
/// Cualquier error dentro del catch se reduce y re-lanza hacia afuera.
async fn run_catch(config: &EngineConfig,
                   catch_unit: &CatchUnit,
                   set: ErrorSet,
                   scope: Option<LoopScope>)
                   -> Result<Args, FlowError> {
    let frame = FrameShared::new(config.clone());
    let mut ctx = StepCtx::new(frame.clone(), scope);

    match (catch_unit.handler)(&mut ctx, set) {
        Ok(ret) => frame.set_sync_return(ret.into_args()),
        Err(error) => frame.push_error(error),
    }
    drop(ctx);
    frame.mark_body_returned();

    if let Err(stall) = frame.settle().await {
        return Err(stall);
    }

    let parts = frame.into_parts();
    match parts.errors.is_empty() {
        true => Ok(assembler::assemble(parts)),
        false => Err(parts.errors
                          .into_reported()
                          .unwrap_or_else(|| FlowError::new("catch failed with empty error set"))),
    }
}
