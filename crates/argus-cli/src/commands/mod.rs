pub mod dispatch;
pub mod investigate;
pub mod schema;
pub mod sources;
pub mod workflow;
