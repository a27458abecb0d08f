pub mod embed_request;
pub mod embed_route;
