//! A small pipeline shell: parse a line into `|`-separated stages, wire pipes
//! between them, apply `<`/`>` redirections and fork/exec one process per stage.

pub mod builtin;
pub mod config;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod parser;
pub mod pipe;
pub mod redirect;
pub mod search;
pub mod signal;
pub mod spawn;
pub mod tokenize;
pub mod types;

pub use error::{Error, Result, SyntaxError};
pub use eval::{dispatch, Dispatched};
pub use global::State;
