pub mod error;
pub mod model {
    pub mod game;
    pub mod messages;
}
pub mod utility;

pub use error::{Error, Result};
