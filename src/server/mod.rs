mod certificates;
pub mod dto;
mod pages;
pub mod response;
mod router;
mod scores;
mod users;
pub mod validation;

pub use router::{AppState, create_router};
