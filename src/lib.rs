//! stepflow-rust: fachada del workspace.
//!
//! Re-exporta la superficie pública del motor (`step-core`) y de los
//! colaboradores externos (`step-adapters`) para consumidores que dependen
//! del paquete raíz.

pub use step_adapters::{guard, pump, ChannelSource, EventSource, PANIC_CODE};
pub use step_core::{absent, Args, EngineConfig, ErrorFilter, ErrorSet, EventAdapter, Flow, FlowBuilder, FlowError,
                    Group, Handle, LoopLabel, LoopMode, LoopSpec, LoopUnit, StepCtx, StepReturn};
