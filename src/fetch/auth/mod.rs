mod parent_header;

pub use parent_header::ParentHeader;
