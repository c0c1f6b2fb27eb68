pub mod cursor;
pub mod status;

pub use cursor::CursorTracker;
pub use status::{parse_status_id, Author, Status};
