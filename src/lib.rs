pub mod auth;
pub mod config;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod readmodel;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;
