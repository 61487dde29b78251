#[path = "hash/selection.rs"]
mod selection;
#[path = "hash/store_and_find.rs"]
mod store_and_find;
