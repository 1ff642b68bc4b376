#![doc = include_str!("RUSTDOC.md")]

pub mod auth;
pub mod firestore;
pub mod functions;
pub mod storage;
