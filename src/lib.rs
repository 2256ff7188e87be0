// src/lib.rs
//! Credential persistence and CSV import service.

pub mod cipher;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod http;
pub mod import;
pub mod models;
pub mod repository;
pub mod service;
pub mod store;
