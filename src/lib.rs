//! Feeds adjacent pairs of ATT&CK technique descriptions to an external
//! natural-language → temporal-logic translator and prints the formulas it
//! returns.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod printer;
pub mod progress;
pub mod textutil;
