mod actor;
mod user;
mod validators;

pub use actor::*;
pub use user::*;
pub use validators::*;
