use log::info;

use crate::{ConnectionSettings, Driver};

/// Result text written while a test is in flight.
pub const RESULT_TESTING: &str = "Testing...";

/// Result text written after a successful test.
pub const RESULT_SUCCESS: &str = "Success";

/// Opens and immediately closes a connection for the current settings,
/// recording the outcome in `last_test_result`.
///
/// Runs synchronously on the calling thread and blocks for the duration of
/// the attempt. Re-entry is prevented at the UI layer through `can_test`;
/// the tester itself imposes no mutual exclusion.
pub struct ConnectionTester;

impl ConnectionTester {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self, settings: &mut ConnectionSettings, driver: &dyn Driver) {
        settings.set_testing(true);
        settings.set_last_test_result(RESULT_TESTING);

        let outcome = driver.test_connection(&settings.descriptor());

        match outcome {
            Ok(()) => {
                info!("Connection test succeeded for {}", settings.server());
                settings.set_last_test_result(RESULT_SUCCESS);
            }
            Err(e) => {
                info!("Connection test failed: {}", e);
                settings.set_last_test_result(e.to_string());
            }
        }

        // Testing is re-enabled only after the outcome is recorded
        settings.set_testing(false);
    }
}

impl Default for ConnectionTester {
    fn default() -> Self {
        Self::new()
    }
}
