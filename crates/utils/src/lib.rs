pub mod pagination;
pub mod patch;
pub mod response;
