mod builder;
mod error;
mod session;
mod settings;
mod tester;
mod traits;

pub use builder::ConnectionStringBuilder;
pub use error::ConnectError;
pub use session::DialogSession;
pub use settings::{AuthMode, ConnectionSettings, SettingsField, SubscriptionId};
pub use tester::{ConnectionTester, RESULT_SUCCESS, RESULT_TESTING};
pub use traits::{Connection, Driver};
