pub mod collection;
pub mod record;
pub mod search;

pub use collection::delete as collection_delete;
pub use collection::get as collection_get;
pub use collection::recent as collection_recent;

pub use record::delete as record_delete;
pub use record::get as record_get;

pub use search::get as search_get;
