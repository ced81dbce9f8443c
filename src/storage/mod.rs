pub mod document_store;
pub mod layout;
pub mod snapshot;
