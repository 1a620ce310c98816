//! Engine module: compiled flows, builder and loop controller.
//!
//! Provee el flujo compilado (`Flow`), el builder consumible
//! (`FlowBuilder`), el contexto explícito de paso (`StepCtx`) y el
//! controlador de loops con labels.

pub mod builder;
pub mod core;
pub mod ctx;
pub mod loops;

pub use builder::FlowBuilder;
pub use core::{CatchFn, Flow, StepFn};
pub use ctx::StepCtx;
pub use loops::{LoopLabel, LoopMode, LoopSpec, LoopUnit};
