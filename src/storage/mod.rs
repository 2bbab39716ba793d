pub mod memory;
pub mod postgres;

pub use memory::InMemorySubscriberStore;
pub use postgres::PostgresSubscriberStore;
