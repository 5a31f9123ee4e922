//! ZTM Gdańsk departure board server.
//!
//! Polls the open-data feeds of Gdańsk public transport and serves
//! live departure boards: normalized departures per configured stop,
//! with stop metadata and vehicle equipment resolved from the static
//! datasets.

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod normalize;
pub mod registry;
pub mod stops;
pub mod vehicles;
pub mod web;
pub mod ztm;
