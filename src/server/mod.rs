mod admin;
pub mod dto;
pub mod response;
mod robots;
mod router;

pub use admin::admin_router;
pub use robots::{TOTAL_COUNT_HEADER, robot_router};
pub use router::{AppState, create_router};
