//! TUI pane rendering modules
//!
//! Each pane module exports a `render_*_pane()` function that draws from
//! borrowed history data and keeps only its own scroll state.
//!
//! - [`source`]: original source with syntax highlighting and the current line
//! - [`variables`]: snapshot values, current value and call chain
//! - [`checkpoint`]: checkpoint recorded at the current step
//! - [`console`]: `console.log` output up to the current step
//! - [`status`]: status bar with keybindings and navigation state

pub mod checkpoint;
pub mod console;
pub mod source;
pub mod status;
pub mod variables;

pub use checkpoint::render_checkpoint_pane;
pub use console::render_console_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use variables::render_variables_pane;
