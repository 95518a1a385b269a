// User registry: the store contract, its backends, merge policies and the
// direct API handlers the front-end calls.

pub mod handlers;
pub mod memory;
pub mod merge;
pub mod postgres;
pub mod store;
