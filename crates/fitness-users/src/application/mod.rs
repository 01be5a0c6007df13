//! Users application services.

pub mod command_handlers;
