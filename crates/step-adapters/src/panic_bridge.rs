//! Puente de excepciones: trabajo externo que entra en pánico fuera de la
//! pila síncrona de un paso se redirige al flujo como error de rama, en
//! lugar de escapar a un manejador global del proceso.

use std::any::Any;

use futures::FutureExt;
use log::warn;
use std::future::Future;

use step_core::{Args, FlowError, Handle};

/// Código categórico de los pánicos puenteados.
pub const PANIC_CODE: &str = "EPANIC";

/// Corre `work` y entrega su resultado al handle; un pánico dentro del
/// trabajo resuelve el handle con un error `EPANIC` en su lugar.
///
/// Uso típico: `tokio::spawn(guard(handle, async move { ... }))`.
pub async fn guard<F>(handle: Handle, work: F)
    where F: Future<Output = Result<Args, FlowError>>
{
    match std::panic::AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => handle.complete(result),
        Err(payload) => {
            let message = describe_panic(payload.as_ref());
            warn!("bridged panic from external work: {message}");
            handle.err(FlowError::with_code(PANIC_CODE, message));
        }
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "external work panicked".to_string()
    }
}
