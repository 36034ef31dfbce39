pub mod functions;
pub mod http;
pub mod impressions;
pub mod model;
pub mod queue;
pub mod sqlite_store;
pub mod store;
