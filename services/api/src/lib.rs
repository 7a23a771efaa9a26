pub mod adapters;
pub mod config;
pub mod credentials;
pub mod error;
pub mod seed;
pub mod web;
