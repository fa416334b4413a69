pub mod index;
pub mod sheets;
pub mod status;
