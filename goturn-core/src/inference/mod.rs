pub mod goturn;
pub mod model;

pub use model::{Device, Model, OnnxSession, Regressor};
