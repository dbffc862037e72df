#![doc = include_str!("../README.md")]

mod config;
mod error;
mod manager;
mod message;
mod provider;
mod queue;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::manager::*;
pub use crate::message::*;
pub use crate::provider::*;
pub use crate::queue::*;

pub use async_trait::async_trait;
