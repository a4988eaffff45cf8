//! Invocation host glue
//!
//! `handler` runs the removal pipeline for one event; `lambda` feeds it
//! events from the Lambda Runtime API.

pub mod handler;
pub mod lambda;

pub use handler::{DefaultHandler, RemovalHandler};
pub use lambda::{Completed, Invocation, LambdaRuntime};
