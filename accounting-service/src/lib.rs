//! Accounting Service - bank accounts, transactions, invoices, bills and
//! reports for small businesses.

pub mod auth;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;
