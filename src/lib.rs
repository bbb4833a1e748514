pub mod auth;
pub mod backup;
pub mod broadcast;
pub mod conflicts;
pub mod error;
pub mod export;
pub mod ipc;
pub mod models;
pub mod remote;
pub mod results;
pub mod store;
pub mod sync;
