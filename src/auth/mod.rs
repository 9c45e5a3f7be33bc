mod login;

pub use login::{LoginOutcome, authenticate};
