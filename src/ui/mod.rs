//! TUI module for the study deck.

mod app;
pub mod theme;
mod widgets;

pub use app::App;
