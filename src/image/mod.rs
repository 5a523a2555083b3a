pub mod difference;
pub mod frame;
pub mod registration;
pub mod trim;
