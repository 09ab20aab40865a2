// storefront/src/lib.rs

//! Ochre storefront service: cart, orders, Paystack checkout and webhook
//! confirmation, built on `ochre_flow` pipelines.

pub mod config;
pub mod errors;
pub mod models;
pub mod money;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
