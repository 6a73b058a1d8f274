//! # stock-guard
//!
//! Inventory consistency core for a shop backend.
//!
//! - [`lock`] - distributed lock manager with leases and a renewal watchdog
//! - [`stock`] - write-through stock cache in the shared key-value service
//! - [`checkout`] - cart checks and checkout orchestration on top of both
//!
//! The key-value service and the durable store are traits ([`kv::KvStore`],
//! [`store::DurableStore`]) with in-process actor backends, wired together by
//! [`app_system::InventorySystem`].

pub mod domain;
pub mod actor_framework;
pub mod product_actor;
pub mod account_actor;
pub mod cart_actor;
pub mod clients;
pub mod kv;
pub mod lock;
pub mod store;
pub mod stock;
pub mod checkout;
pub mod config;
pub mod app_system;

#[cfg(test)]
mod mock_framework;
