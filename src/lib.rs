pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod session;
pub mod todos;
pub mod token;
pub mod webhook;
