pub mod bucket_handlers;
pub mod object_handlers;
