//! Helper functions shared by the renderers, the server and the commands

mod date;
mod reading_time;
mod url;

pub use self::date::*;
pub use self::reading_time::*;
pub use self::url::*;
