//! Demo ejecutable del motor: compone un flujo con ramas concurrentes, un
//! loop recolector y un catch filtrado, y lo invoca dos veces para mostrar
//! que la definición es reutilizable.

use serde_json::json;
use step_core::{ErrorFilter, FlowBuilder, FlowError, LoopSpec, StepReturn};

#[tokio::main]
async fn main() {
    step_core::config::init_dotenv();

    // cuerpo del loop: duplica el elemento recibido
    let double = FlowBuilder::from_env().step(|_ctx, args| {
                                            let n = args[0].as_i64().unwrap_or(0);
                                            Ok(StepReturn::Value(json!(n * 2)))
                                        })
                                        .build();

    let flow = FlowBuilder::from_env()
        // paso 1: dos ramas concurrentes, posiciones por orden de declaración
        .step(|ctx, _args| {
            let slow = ctx.handle();
            let fast = ctx.handle();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                slow.ok(json!(1));
            });
            tokio::spawn(async move {
                fast.ok(json!(2));
            });
            Ok(StepReturn::None)
        })
        // paso 2: valida las entradas y las convierte en elementos del loop
        .step(|_ctx, args| {
            if args.len() != 2 {
                return Err(FlowError::with_code("EARITY", "expected two branch results"));
            }
            Ok(StepReturn::Value(json!(null)))
        })
        .catch_filtered(ErrorFilter::code("EARITY"), |_ctx, errors| {
            eprintln!("recovered: {}", errors);
            Ok(StepReturn::Value(json!(null)))
        })
        // paso 3: loop recolector sobre elementos fijos
        .repeat_flow(&double, LoopSpec::each(vec![json!(1), json!(2), json!(3)]).gathered())
        .build();

    for invocation in 0..2 {
        match flow.call(vec![]).await {
            Ok(results) => println!("invocation {invocation}: {}", json!(results)),
            Err(error) => {
                eprintln!("invocation {invocation} failed: {error}");
                std::process::exit(4);
            }
        }
    }
}
