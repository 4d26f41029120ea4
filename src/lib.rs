//! BlogVoyage: a multi-user blogging service with groups, comments and
//! author follows, served by axum over Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
