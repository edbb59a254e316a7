//! # Loyalty server
//! This crate hosts the long-running part of the loyalty points service. It is responsible for:
//! * Reading its configuration from the environment.
//! * Asking the accrual service about every order that has not been settled yet, and crediting users once an order
//!   is settled. See [accrual_worker](accrual_worker/index.html).
//! * Stopping cleanly on Ctrl-C.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod service;
