pub mod tool_query_route;
pub mod tool_request;
pub mod tool_stream_route;
