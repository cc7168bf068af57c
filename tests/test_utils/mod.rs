pub mod fixtures;

pub use fixtures::{Engine, big_fields, engine, engine_with, fields};
