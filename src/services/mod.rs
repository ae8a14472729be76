pub mod rating_store;
pub mod recommendation;
pub mod session;
