//! Drivers that own a [`PanelRuntime`](super::PanelRuntime) and feed it
//! real input.

pub mod cli;
