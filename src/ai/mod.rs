pub mod capability;
pub mod factory;
pub mod ollama;
pub mod openai_compatible;

#[cfg(test)]
pub mod scripted;

pub use capability::*;
pub use factory::*;
