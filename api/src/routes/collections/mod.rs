pub mod add_documents_route;
pub mod collection_request;
pub mod collection_response;
pub mod collections_route;
pub mod query_collection_route;
