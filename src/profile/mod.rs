pub mod config;
pub mod resolver;

pub use config::{ParseReturnShapeError, ProfileConfig, ProfileConfigError, ReturnShape};
pub use resolver::{Entity, ProfileRelation, ProfileResolver, Resolution};
