pub mod handle;
pub mod mutation;
pub mod query;
pub mod route;
pub mod schema;
pub mod subscription;
pub mod types;
