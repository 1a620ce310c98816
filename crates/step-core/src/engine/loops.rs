//! Controlador de loops: envuelve un sub-flujo como loop sin fin, contado,
//! por elemento o recolector, con reinicio manual por label.
//!
//! El driver es un trampolín explícito (estados re-entrantes nombrados, sin
//! re-invocación recursiva), de modo que loops largos no crecen la pila.
//! Un error no capturado dentro de una iteración aborta el loop completo y
//! se convierte en el error del paso propietario.

use std::sync::Arc;

use log::debug;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

use crate::engine::Flow;
use crate::errors::FlowError;
use crate::model::Args;

/// Modo de invocación del loop.
#[derive(Debug, Clone)]
pub enum LoopMode {
    /// Sin invocar: una sola pasada, como un flujo anidado ordinario.
    Once,
    /// Sin fin: la salida de cada iteración alimenta la siguiente; termina
    /// sólo con una salida explícita desde dentro. `seed` reemplaza la
    /// entrada de la primera iteración.
    Endless { seed: Option<Args> },
    /// N iteraciones; el índice base cero se anexa como entrada final de cada
    /// iteración y la salida anterior alimenta hacia adelante.
    Counted(usize),
    /// Una iteración por elemento, con entrada `(elemento, índice)`.
    Each(Vec<Value>),
}

/// Modo + recolección. `gathered` anexa el resultado terminal de cada
/// iteración a un array entregado como salida del loop (contado/por
/// elemento).
#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub(crate) mode: LoopMode,
    pub(crate) gather: bool,
}

impl LoopSpec {
    pub fn once() -> Self {
        Self { mode: LoopMode::Once, gather: false }
    }

    pub fn endless() -> Self {
        Self { mode: LoopMode::Endless { seed: None },
               gather: false }
    }

    /// Sin fin, sembrado: `seed` es la entrada de la primera iteración.
    pub fn seeded(seed: Args) -> Self {
        Self { mode: LoopMode::Endless { seed: Some(seed) },
               gather: false }
    }

    pub fn counted(n: usize) -> Self {
        Self { mode: LoopMode::Counted(n), gather: false }
    }

    pub fn each(items: Vec<Value>) -> Self {
        Self { mode: LoopMode::Each(items), gather: false }
    }

    /// Marca el modo recolector.
    pub fn gathered(mut self) -> Self {
        self.gather = true;
        self
    }
}

/// Label re-entrante: invocarlo reinicia el cuerpo desde su primer paso con
/// los argumentos dados, independiente de la progresión normal.
#[derive(Clone)]
pub struct LoopLabel {
    tx: mpsc::UnboundedSender<Args>,
}

impl LoopLabel {
    /// Reinicio manual. Devuelve `false` si el loop ya no existe.
    pub fn restart(&self, args: Args) -> bool {
        self.tx.send(args).is_ok()
    }
}

/// Alcance entregado a los pasos que corren dentro de un loop.
#[derive(Clone)]
pub(crate) struct LoopScope {
    pub(crate) exit: mpsc::UnboundedSender<Result<Args, FlowError>>,
    pub(crate) index: usize,
}

/// Unidad de paso que es a la vez un flujo y un modo de invocación.
///
/// Construirla crea el label reutilizable; el canal del label es del ámbito
/// de la definición, por lo que sigue siendo invocable desde fuera del
/// cuerpo y sobrevive a la progresión normal.
pub struct LoopUnit {
    pub(crate) flow: Flow,
    pub(crate) spec: LoopSpec,
    label_tx: mpsc::UnboundedSender<Args>,
    label_rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Args>>>,
}

impl LoopUnit {
    pub fn new(flow: Flow, spec: LoopSpec) -> Self {
        let (label_tx, label_rx) = mpsc::unbounded_channel();
        Self { flow,
               spec,
               label_tx,
               label_rx: Arc::new(AsyncMutex::new(label_rx)) }
    }

    /// Label reutilizable del loop.
    pub fn label(&self) -> LoopLabel {
        LoopLabel { tx: self.label_tx.clone() }
    }
}

/// Valor terminal de una iteración para el modo recolector.
fn gather_value(values: &Args) -> Value {
    match values.len() {
        0 => Value::Null,
        1 => values[0].clone(),
        _ => Value::Array(values.clone()),
    }
}

/// Trampolín del loop. Estados re-entrantes: decidir entrada, correr la
/// iteración, y resolver entre finalización normal, reinicio por label y
/// salida explícita.
pub(crate) async fn drive(unit: &LoopUnit, args: Args) -> Result<Args, FlowError> {
    let spec = &unit.spec;

    // Serializa la entrega del label por invocación del loop y descarta
    // mensajes de invocaciones anteriores.
    let mut label_rx = unit.label_rx.lock().await;
    while label_rx.try_recv().is_ok() {}

    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<Result<Args, FlowError>>();

    let mut carry: Args = match &spec.mode {
        LoopMode::Endless { seed: Some(seed) } => seed.clone(),
        _ => args,
    };
    let mut gathered: Vec<Value> = Vec::new();
    let mut index: usize = 0;
    let mut completed: usize = 0;
    let mut restart_input: Option<Args> = None;

    loop {
        // Cede el turno entre iteraciones: un cuerpo puramente síncrono no
        // debe monopolizar el ejecutor cooperativo ni dejar fuera al label.
        tokio::task::yield_now().await;

        // Estado: decidir la entrada de la próxima iteración o terminar.
        let iter_input: Args = match restart_input.take() {
            Some(input) => input,
            None => match &spec.mode {
                LoopMode::Once => {
                    if completed > 0 {
                        break;
                    }
                    carry.clone()
                }
                LoopMode::Endless { .. } => carry.clone(),
                LoopMode::Counted(n) => {
                    if index >= *n {
                        break;
                    }
                    let mut input = carry.clone();
                    input.push(json!(index));
                    input
                }
                LoopMode::Each(items) => {
                    if index >= items.len() {
                        break;
                    }
                    vec![items[index].clone(), json!(index)]
                }
            },
        };

        let scope = LoopScope { exit: exit_tx.clone(), index };
        let mut iteration = unit.flow.call_scoped(iter_input, Some(scope));

        // Estado: correr la iteración, atendiendo label y salida explícita.
        let outcome = tokio::select! {
            res = &mut iteration => res,
            Some(input) = label_rx.recv() => {
                // Reinicio manual: la iteración en vuelo queda superada y el
                // cuerpo re-entra desde su primer paso. El índice contado no
                // avanza.
                debug!("loop restart via label at iteration {index}");
                restart_input = Some(input);
                continue;
            }
            Some(exit) = exit_rx.recv() => return exit,
        };

        match outcome {
            Ok(values) => {
                // Salida explícita emitida durante la iteración gana sobre la
                // progresión normal.
                if let Ok(exit) = exit_rx.try_recv() {
                    return exit;
                }
                if spec.gather {
                    gathered.push(gather_value(&values));
                }
                carry = values;
                index += 1;
                completed += 1;
            }
            Err(error) => return Err(error),
        }
    }

    if spec.gather {
        Ok(vec![Value::Array(gathered)])
    } else {
        Ok(carry)
    }
}
