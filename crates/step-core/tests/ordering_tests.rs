//! Posiciones de resultado: orden de declaración, nunca orden de llegada.

use std::time::Duration;

use serde_json::json;
use step_core::{FlowBuilder, StepReturn};

#[tokio::test]
async fn k_handles_deliver_declaration_order_under_reversed_completion() {
    // Cuatro ramas que terminan en orden inverso al de declaración.
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     for i in 0..4u64 {
                                         let handle = ctx.handle();
                                         tokio::spawn(async move {
                                             // la rama declarada primero termina última
                                             tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                                             handle.ok(json!(i));
                                         });
                                     }
                                     Ok(StepReturn::None)
                                 })
                                 .step(|_ctx, args| Ok(StepReturn::Spread(args)))
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!(0), json!(1), json!(2), json!(3)],
               "slot order must follow declaration order");
}

#[tokio::test]
async fn sync_return_precedes_handle_slots() {
    // Contribución síncrona + un handle: el retorno va primero.
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let handle = ctx.handle();
                                     tokio::spawn(async move {
                                         handle.ok(json!("async"));
                                     });
                                     Ok(StepReturn::Value(json!("sync")))
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!("sync"), json!("async")]);
}

#[tokio::test]
async fn results_chain_between_steps() {
    let flow = FlowBuilder::new().step(|_ctx, args| {
                                     let n = args[0].as_i64().unwrap_or(0);
                                     Ok(StepReturn::Value(json!(n + 1)))
                                 })
                                 .step(|_ctx, args| {
                                     let n = args[0].as_i64().unwrap_or(0);
                                     Ok(StepReturn::Value(json!(n * 10)))
                                 })
                                 .build();

    let out = flow.call(vec![json!(4)]).await.expect("flow should complete");
    assert_eq!(out, vec![json!(50)]);
}

#[tokio::test]
async fn handle_resolved_synchronously_inside_body() {
    // Resolver dentro del propio cuerpo también es válido: el frame se
    // resuelve sin suspensión.
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let handle = ctx.handle();
                                     handle.ok(json!("inline"));
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!("inline")]);
}

#[tokio::test]
async fn empty_resolution_keeps_positional_accounting() {
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let first = ctx.handle();
                                     let second = ctx.handle();
                                     tokio::spawn(async move {
                                         first.done();
                                         second.ok(json!("present"));
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!(null), json!("present")],
               "a resolution without values contributes an explicit absent");
}
