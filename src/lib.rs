pub mod config;
pub mod domain;
pub mod email_client;
pub mod ports;
pub mod routes;
pub mod services;
pub mod startup;
pub mod storage;
pub mod telemetry;
