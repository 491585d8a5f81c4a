pub mod entities;
pub mod evaluator;
pub mod ports;
pub mod tree;
pub mod value_objects;
