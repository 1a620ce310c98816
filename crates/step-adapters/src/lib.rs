//! step-adapters: Colaboradores externos del motor de flujos.
//!
//! Este crate provee:
//! - El contrato `EventSource` y su bomba hacia el par acumulación/terminal
//!   de un frame, para fuentes de eventos sin convención error-first.
//! - El puente de excepciones: redirige pánicos de trabajo externo hacia el
//!   flujo como un error, en lugar de dejarlos escapar al manejador del
//!   proceso.
//!
//! Nota: el core sólo conoce handles y frames; aquí se adapta el mundo
//! exterior a esos contratos.

pub mod events;
pub mod panic_bridge;

pub use events::{pump, ChannelSource, EventSource};
pub use panic_bridge::{guard, PANIC_CODE};
