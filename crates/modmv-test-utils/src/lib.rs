pub mod lock;
pub mod sandbox;
