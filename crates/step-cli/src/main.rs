use serde_json::{json, Value};
use step_core::{FlowBuilder, LoopSpec, StepReturn};

fn main() {
    // Cargar .env si existe para recoger configuración STEPFLOW_*
    let _ = dotenvy::dotenv();
    // CLI mínima: `step-cli sum --items <CSV>` | `step-cli fanout --count <N>`
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "sum" {
        let mut items: Option<String> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--items" => {
                    i += 1;
                    if i < args.len() { items = Some(args[i].clone()); }
                }
                _ => {}
            }
            i += 1;
        }

        if let Some(csv) = items {
            let parsed: Vec<Value> = csv.split(',')
                                        .filter_map(|s| s.trim().parse::<i64>().ok())
                                        .map(|n| json!(n))
                                        .collect();
            if parsed.is_empty() {
                eprintln!("[step-cli sum] --items no contiene enteros");
                std::process::exit(3);
            }

            // each-loop recolector + paso de reducción
            let body = FlowBuilder::from_env().step(|_ctx, args| Ok(StepReturn::Value(args[0].clone())))
                                              .build();
            let flow = FlowBuilder::from_env().repeat_flow(&body, LoopSpec::each(parsed).gathered())
                                              .step(|_ctx, args| {
                                                  let sum: i64 = args[0].as_array()
                                                                        .map(|rows| {
                                                                            rows.iter()
                                                                                .filter_map(|v| v.as_i64())
                                                                                .sum()
                                                                        })
                                                                        .unwrap_or(0);
                                                  Ok(StepReturn::Value(json!(sum)))
                                              })
                                              .build();

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => { eprintln!("[step-cli sum] runtime error: {e}"); std::process::exit(5); }
            };
            match runtime.block_on(flow.call(vec![])) {
                Ok(out) => { println!("sum = {}", out[0]); std::process::exit(0); }
                Err(e) => { eprintln!("error: {e}"); std::process::exit(4); }
            }
        } else {
            eprintln!("Uso: step-cli sum --items <CSV>");
            std::process::exit(2);
        }
    } else if args.len() >= 2 && args[1] == "fanout" {
        let mut count: Option<usize> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--count" => {
                    i += 1;
                    if i < args.len() { count = args[i].parse::<usize>().ok(); }
                }
                _ => {}
            }
            i += 1;
        }

        if let Some(n) = count {
            // n ramas concurrentes con resolución en orden inverso: el orden
            // de declaración decide las posiciones igualmente
            let flow = FlowBuilder::from_env().step(move |ctx, _args| {
                                                  for k in 0..n {
                                                      let handle = ctx.handle();
                                                      tokio::spawn(async move {
                                                          let delay = (n - k) as u64 * 5;
                                                          tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                                                          handle.ok(json!(k));
                                                      });
                                                  }
                                                  Ok(StepReturn::None)
                                              })
                                              .build();

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => { eprintln!("[step-cli fanout] runtime error: {e}"); std::process::exit(5); }
            };
            match runtime.block_on(flow.call(vec![])) {
                Ok(out) => { println!("fanout = {}", Value::Array(out)); std::process::exit(0); }
                Err(e) => { eprintln!("error: {e}"); std::process::exit(4); }
            }
        } else {
            eprintln!("Uso: step-cli fanout --count <N>");
            std::process::exit(2);
        }
    } else {
        println!("step-cli: use 'sum' or 'fanout' subcommands");
    }
}
