pub mod format;
pub mod metrics;
pub mod resolver;
pub mod source;
pub mod template;
pub mod transplant;
