pub mod info;
pub mod maintenance;
