pub mod component;
pub mod parameter;

pub use component::{ComponentBuilder, ComponentDefinition};
pub use parameter::{ParamType, ParamValue, Parameter};
