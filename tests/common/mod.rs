mod test_server;

pub use test_server::{ADMIN_HTML, LOGIN_HTML, TestServer, USER_HTML};
