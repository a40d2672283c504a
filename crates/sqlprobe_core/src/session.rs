use std::sync::Arc;

use log::info;

use crate::{ConnectError, ConnectionSettings, ConnectionStringBuilder, ConnectionTester, Driver};

/// One dialog session: owns the settings being edited and the driver used
/// for test attempts. Returns the finished descriptor on confirmation;
/// nothing is persisted.
pub struct DialogSession {
    settings: ConnectionSettings,
    driver: Arc<dyn Driver>,
    tester: ConnectionTester,
}

impl DialogSession {
    /// Session over the default descriptor (local instance, Windows auth).
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_descriptor(driver, ConnectionStringBuilder::default())
    }

    /// Session over a caller-supplied descriptor, e.g. to edit an existing
    /// connection.
    pub fn with_descriptor(driver: Arc<dyn Driver>, descriptor: ConnectionStringBuilder) -> Self {
        Self {
            settings: ConnectionSettings::new(descriptor),
            driver,
            tester: ConnectionTester::new(),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ConnectionSettings {
        &mut self.settings
    }

    /// Runs a blocking connection test against the session's driver.
    pub fn test(&mut self) {
        self.tester.test(&mut self.settings, self.driver.as_ref());
    }

    /// Confirms the dialog, returning the validated descriptor.
    pub fn confirm(self) -> Result<ConnectionStringBuilder, ConnectError> {
        if !self.settings.is_valid() {
            return Err(ConnectError::InvalidDescriptor(
                "Server name is required".to_string(),
            ));
        }

        info!("Dialog confirmed for server {}", self.settings.server());
        Ok(self.settings.descriptor())
    }
}
