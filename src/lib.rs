pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod policy;
pub mod repository;
pub mod search;
pub mod service;
pub mod tasks;
