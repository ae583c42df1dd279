pub mod classify;
pub mod dto;
pub mod http_api;

pub use http_api::HttpAuraApi;
