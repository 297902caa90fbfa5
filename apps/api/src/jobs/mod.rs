pub mod coordinator;
pub mod fields;
pub mod filters;
pub mod handlers;
pub mod search;
pub mod store;
pub mod swipe;
