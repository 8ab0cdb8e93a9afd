pub mod events;
pub mod extractor;
pub mod jwt;
pub mod service;
