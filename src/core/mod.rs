//! Core components
//!
//! The exchange controller drives the chat client; the command router and
//! classifier answer requests on the backend side.

mod classify;
mod commands;
mod exchange;

pub use commands::CommandRouter;
pub use exchange::ExchangeController;
