//! Adaptación de fuentes de eventos al par acumulación/terminal del core.
//!
//! El contrato del colaborador: la bomba invoca la acumulación una vez por
//! ocurrencia del evento y el terminal exactamente una vez al completarse el
//! stream; el canal de error opcional se cablea al terminal de fallo.

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::sync::mpsc;

use step_core::{EventAdapter, FlowError};

/// Fuente de eventos externa sin convención error-first.
#[async_trait]
pub trait EventSource: Send {
    /// Próxima ocurrencia. `Ok(None)` señala el fin del stream; `Err` usa el
    /// canal de error dedicado.
    async fn next_event(&mut self) -> Result<Option<Value>, FlowError>;
}

/// Bombea la fuente completa hacia el adaptador del frame.
///
/// Cada ocurrencia apila su valor líder; al agotarse la fuente se invoca el
/// terminal exactamente una vez. Pensada para correr como tarea propia:
/// `tokio::spawn(pump(source, adapter))`.
pub async fn pump<S>(mut source: S, adapter: EventAdapter)
    where S: EventSource + 'static
{
    let mut delivered: usize = 0;
    loop {
        match source.next_event().await {
            Ok(Some(value)) => {
                adapter.emit(value);
                delivered += 1;
            }
            Ok(None) => {
                debug!("event source drained after {delivered} deliveries");
                adapter.close();
                return;
            }
            Err(error) => {
                debug!("event source failed after {delivered} deliveries: {error}");
                adapter.fail(error);
                return;
            }
        }
    }
}

/// Fuente respaldada por un canal: cada mensaje es una ocurrencia y el cierre
/// del canal es el fin del stream.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl ChannelSource {
    /// Devuelve la fuente y el emisor con el que el productor externo entrega
    /// ocurrencias.
    pub fn new() -> (Self, mpsc::UnboundedSender<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Result<Option<Value>, FlowError> {
        Ok(self.rx.recv().await)
    }
}
