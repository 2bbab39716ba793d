mod newsletters;
mod postgres_store;
