//! Proforma Service - quotes and contracts for a laser-cutting shop, with
//! their line items, expenses and profit.

pub mod config;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
