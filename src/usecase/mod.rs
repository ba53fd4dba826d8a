pub mod proxy;
pub mod static_file;
pub mod stream;
