pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod locks;
pub mod logging;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;
