pub mod app;
pub mod charts;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod quick;
pub mod source;
