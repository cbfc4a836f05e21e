pub mod flow;
pub mod request;
pub mod value;
