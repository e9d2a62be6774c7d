//! Backup Tool Dispatcher
//!
//! Composes pgBackRest command lines and runs them inside a running
//! database pod.

pub mod command;
pub mod dispatcher;

pub use command::*;
pub use dispatcher::*;
