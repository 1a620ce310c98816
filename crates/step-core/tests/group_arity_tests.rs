//! Grupos dinámicos: filas por orden de declaración, aridad reconciliada.

use serde_json::json;
use step_core::{FlowBuilder, StepReturn};

#[tokio::test]
async fn empty_group_yields_one_absent_row() {
    // Un grupo declarado sin handles nunca produce un resultado de longitud
    // cero: una fila de aridad 1 con ausente explícito.
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let _group = ctx.group();
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!([[null]])]);
}

#[tokio::test]
async fn mixed_arity_rows_pad_to_max_observed_width() {
    // Fila 0 recibe 1 valor, fila 1 recibe 3: ancho uniforme 3 con las dos
    // posiciones finales de la fila 0 explícitamente ausentes.
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let mut group = ctx.group();
                                     let row0 = group.handle();
                                     let row1 = group.handle();
                                     tokio::spawn(async move {
                                         row0.ok_many(vec![json!("a")]);
                                         row1.ok_many(vec![json!("x"), json!("y"), json!("z")]);
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!([["a", null, null], ["x", "y", "z"]])]);
}

#[tokio::test]
async fn group_rows_follow_declaration_order_not_completion() {
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let mut group = ctx.group();
                                     let row0 = group.handle();
                                     let row1 = group.handle();
                                     let row2 = group.handle();
                                     tokio::spawn(async move {
                                         row2.ok(json!(2));
                                         row0.ok(json!(0));
                                         row1.ok(json!(1));
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!([[0], [1], [2]])]);
}

#[tokio::test]
async fn plain_slots_precede_group_argument() {
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let plain = ctx.handle();
                                     let mut group = ctx.group();
                                     let row = group.handle();
                                     tokio::spawn(async move {
                                         row.ok(json!("grouped"));
                                         plain.ok(json!("plain"));
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!("plain"), json!([["grouped"]])]);
}

#[tokio::test]
async fn two_groups_yield_one_argument_each() {
    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let mut first = ctx.group();
                                     let mut second = ctx.group();
                                     let a = first.handle();
                                     let b = second.handle();
                                     tokio::spawn(async move {
                                         b.ok(json!("b"));
                                         a.ok(json!("a"));
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .build();

    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!([["a"]]), json!([["b"]])]);
}
