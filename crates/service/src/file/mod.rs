pub mod pin_store;
