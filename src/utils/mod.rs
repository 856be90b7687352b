pub mod clock;
pub mod logging;
pub mod path;
pub mod period;
pub mod table;
pub mod time;
