mod driver;

pub use driver::{MssqlConnection, MssqlDriver};
