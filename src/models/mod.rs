pub mod interview;
pub mod slot;
