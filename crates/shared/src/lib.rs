//! Domain types shared across the relato client.

pub mod models;
