// UI module - view mapping and the console front end
//
// This module contains:
// - view: pure WorkflowSnapshot -> ViewState mapping and the DisplaySink seam
// - console: line-oriented controller that renders through a ConsoleScreen

pub mod console;
pub mod view;

pub use console::{Command, CommandError, ConsoleController, ConsoleScreen};
pub use view::{DisplaySink, Element, ViewState, format_file_size, render, view_for};
