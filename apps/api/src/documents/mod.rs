// Document lifecycle: upload, lookup, viewing, download, deletion.
// The metadata itself lives behind `storage::MetadataStore`.

pub mod handlers;
pub mod sanitize;
pub mod service;
