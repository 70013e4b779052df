pub mod clock;
pub mod error;
pub mod session_log;

pub use clock::*;
pub use error::*;
pub use session_log::*;
