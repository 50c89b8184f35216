pub mod admin;
pub mod health;
pub mod hr;
pub mod interview;
pub mod questions;
