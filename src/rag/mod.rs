//! Question answering over course materials.
//!
//! [`ResponseGenerator`] runs the tool-mediated completion loop and
//! [`SessionManager`] keeps the short conversation history fed back into it.

mod generator;
mod session;

pub use generator::ResponseGenerator;
pub use session::SessionManager;
