//! # Introduction
//!
//! stepwise runs a JavaScript-subset program one syntactic unit at a time,
//! recording a snapshot of its variables after every step. The recorded
//! history can be navigated forward and backward, by single steps, by block
//! boundaries or by author-inserted checkpoints, and browsed in a terminal UI
//! built with [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Body → Wrap → Parser → AST → Interpreter → Session → Snapshots → History → TUI
//! ```
//!
//! 1. [`source`]: wraps an author's function body into a runnable program and
//!    maps positions in the wrapped text back to the original.
//! 2. [`parser`]: tokenises the source and builds an arena AST; also collects
//!    the names a program declares.
//! 3. [`interpreter`]: a frame-stack interpreter that advances in micro-steps,
//!    over the value model in [`memory`].
//! 4. [`session`]: one interpreter plus the host bridge (`bindings`,
//!    `checkpoint(...)`), stepping by statement or by node.
//! 5. [`snapshot`]: variable snapshots and the append-only history.
//! 6. [`navigator`]: drives a session, owns history, cursor and autoplay.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use stepwise::config::EngineConfig;
//! use stepwise::navigator::Navigator;
//! use stepwise::source::ProgramSource;
//!
//! let source = ProgramSource::from_body("var x = bindings.n;\nreturn x * 2;", "bindings");
//! let mut bindings = serde_json::Map::new();
//! bindings.insert("n".into(), 21.into());
//!
//! let mut nav = Navigator::new(EngineConfig::default());
//! nav.refresh_source(&source, &bindings).unwrap();
//! nav.go_to_end();
//! assert!(nav.is_complete());
//! ```

pub mod config;
pub mod errors;
pub mod interpreter;
pub mod logging;
pub mod memory;
pub mod navigator;
pub mod parser;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod ui;
