pub mod model;
pub mod session;

pub use model::Goturn;
pub use session::{GoturnSession, RegressorConfig};
