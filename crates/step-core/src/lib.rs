//! step-core: Motor de construcción de control de flujo asíncrono.
//!
//! Compila una secuencia declarada de funciones de paso en una única
//! operación asíncrona compuesta: ejecuta los pasos en orden, despliega
//! ramas concurrentes dentro de un paso, junta sus resultados por posición
//! (independiente del orden de finalización), agrega fallos concurrentes y
//! soporta sub-flujos repetibles (loops) y flujos anidados.
pub mod catch;
pub mod config;
pub mod engine;
pub mod errors;
pub(crate) mod frame;
pub mod handle;
pub mod model;

pub use catch::ErrorFilter;
pub use config::EngineConfig;
pub use engine::{Flow, FlowBuilder, LoopLabel, LoopMode, LoopSpec, LoopUnit, StepCtx};
pub use errors::{ErrorSet, FlowError};
pub use handle::adapter::EventAdapter;
pub use handle::{Group, Handle};
pub use model::{absent, Args, StepReturn};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn single_step_scalar_return_reaches_done_unchanged() {
        // Un paso sin ramas asíncronas: el retorno escalar es el único
        // resultado entregado.
        let flow = FlowBuilder::new().step(|_ctx, args| Ok(StepReturn::Value(args[0].clone())))
                                     .build();
        let out = flow.call(vec![json!("hello")]).await.expect("flow should complete");
        assert_eq!(out, vec![json!("hello")]);
    }

    #[tokio::test]
    async fn sequence_return_spreads_into_multiple_results() {
        let flow = FlowBuilder::new().step(|_ctx, _args| Ok(StepReturn::Spread(vec![json!(1), json!(2), json!(3)])))
                                     .build();
        let out = flow.call(vec![]).await.expect("flow should complete");
        assert_eq!(out, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn handles_deliver_in_declaration_order() {
        // Dos handles resueltos en orden inverso: el orden de declaración
        // fija las posiciones.
        let flow = FlowBuilder::new().step(|ctx, _args| {
                                         let first = ctx.handle();
                                         let second = ctx.handle();
                                         tokio::spawn(async move {
                                             second.ok(json!("second"));
                                             first.ok(json!("first"));
                                         });
                                         Ok(StepReturn::None)
                                     })
                                     .build();
        let out = flow.call(vec![]).await.expect("flow should complete");
        assert_eq!(out, vec![json!("first"), json!("second")]);
    }

    #[test]
    fn definition_is_reusable_across_invocations() {
        let flow = FlowBuilder::new().step(|_ctx, args| Ok(StepReturn::Value(json!(args.len()))))
                                     .build();
        let a = tokio_test::block_on(flow.call(vec![json!(1)])).expect("first invocation");
        let b = tokio_test::block_on(flow.call(vec![json!(1), json!(2)])).expect("second invocation");
        assert_eq!(a, vec![json!(1)]);
        assert_eq!(b, vec![json!(2)]);
    }
}
