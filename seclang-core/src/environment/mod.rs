pub mod builtins;
pub mod collector;
pub mod context;
pub mod environment;
pub mod value;

pub mod prelude {
    pub use super::{
        context::*,
        environment::*,
        value::*
    };
}
