use serde_json::json;
use stepflow_rust::{ErrorFilter, FlowBuilder, FlowError, LoopSpec, StepReturn};

#[tokio::test]
async fn whole_stack_composes_branches_loops_and_catch() {
    // ramas concurrentes -> reducción -> loop contado recolector -> catch
    let body = FlowBuilder::new().step(|_ctx, args| {
                                     let carry = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
                                     let index = args.last().and_then(|v| v.as_i64()).unwrap_or(0);
                                     Ok(StepReturn::Value(json!(carry + index)))
                                 })
                                 .build();

    let flow = FlowBuilder::new().step(|ctx, _args| {
                                     let a = ctx.handle();
                                     let b = ctx.handle();
                                     tokio::spawn(async move {
                                         b.ok(json!(30));
                                         a.ok(json!(12));
                                     });
                                     Ok(StepReturn::None)
                                 })
                                 .step(|_ctx, args| {
                                     let sum: i64 = args.iter().filter_map(|v| v.as_i64()).sum();
                                     Ok(StepReturn::Value(json!(sum)))
                                 })
                                 .repeat_flow(&body, LoopSpec::counted(3))
                                 .step(|_ctx, args| {
                                     let n = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
                                     if n != 45 {
                                         return Err(FlowError::with_code("EBADSUM", format!("got {n}")));
                                     }
                                     Ok(StepReturn::Value(json!(n)))
                                 })
                                 .catch_filtered(ErrorFilter::code("EBADSUM"),
                                                 |_ctx, _errors| Ok(StepReturn::Value(json!(-1))))
                                 .build();

    // 12 + 30 = 42; iteraciones: 42+0, 42+1... el carry avanza 42 -> 42 -> 43 -> 45
    let out = flow.call(vec![]).await.expect("flow should complete");
    assert_eq!(out, vec![json!(45)]);
}
