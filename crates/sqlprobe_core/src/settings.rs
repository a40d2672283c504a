use std::env;

use log::debug;
use uuid::Uuid;

use crate::ConnectionStringBuilder;

/// Field identifier delivered to observers when a setting or one of its
/// derived flags changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    Server,
    ServerValid,
    IntegratedAuth,
    CredentialsEnabled,
    AuthenticationMode,
    UserName,
    Password,
    TestingEnabled,
    TestResult,
}

/// Authentication mode as presented in the dialog's combo box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Windows,
    SqlServer,
}

impl AuthMode {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Windows => "Windows Authentication",
            AuthMode::SqlServer => "SQL Server Authentication",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Windows Authentication" => Some(AuthMode::Windows),
            "SQL Server Authentication" => Some(AuthMode::SqlServer),
            _ => None,
        }
    }
}

pub type SubscriptionId = Uuid;

type Observer = Box<dyn FnMut(SettingsField)>;

/// Observable connection settings backing the dialog's form fields.
///
/// Every setter recomputes the derived flags and notifies observers
/// synchronously, in registration order, one notification per affected
/// field: the primary field first, then each derived flag, then the
/// result-reset. All inputs are accepted as-is; an empty server is only
/// flagged through `is_valid`.
pub struct ConnectionSettings {
    builder: ConnectionStringBuilder,
    is_testing: bool,
    last_test_result: String,
    os_identity: String,
    observers: Vec<(SubscriptionId, Observer)>,
}

impl ConnectionSettings {
    /// One instance per dialog session, from caller-supplied initial values.
    pub fn new(builder: ConnectionStringBuilder) -> Self {
        let os_identity = env::var("USERNAME")
            .or_else(|_| env::var("USER"))
            .unwrap_or_default();

        Self {
            builder,
            is_testing: false,
            last_test_result: String::new(),
            os_identity,
            observers: Vec::new(),
        }
    }

    /// Overrides the cached OS identity. Useful for deterministic tests.
    pub fn with_os_identity(mut self, identity: impl Into<String>) -> Self {
        self.os_identity = identity.into();
        self
    }

    pub fn server(&self) -> &str {
        &self.builder.data_source
    }

    pub fn set_server(&mut self, server: impl Into<String>) {
        self.builder.data_source = server.into();
        self.notify(SettingsField::Server);
        self.notify(SettingsField::ServerValid);
        self.notify(SettingsField::TestingEnabled);
        self.reset_test_result();
    }

    pub fn use_integrated_auth(&self) -> bool {
        self.builder.integrated_security
    }

    /// Change-detecting: notifies only when the value actually flips.
    pub fn set_use_integrated_auth(&mut self, value: bool) {
        if value == self.builder.integrated_security {
            return;
        }

        self.builder.integrated_security = value;
        self.notify(SettingsField::IntegratedAuth);
        self.notify(SettingsField::CredentialsEnabled);
        self.notify(SettingsField::AuthenticationMode);
        self.reset_test_result();
    }

    /// Returns the caller's OS identity under integrated auth, otherwise
    /// the stored explicit login. The stored value is never overwritten.
    pub fn user_name(&self) -> &str {
        if self.builder.integrated_security {
            &self.os_identity
        } else {
            &self.builder.user_id
        }
    }

    pub fn set_user_name(&mut self, user_name: impl Into<String>) {
        self.builder.user_id = user_name.into();
        self.notify(SettingsField::UserName);
        self.reset_test_result();
    }

    /// Empty under integrated auth, otherwise the stored password.
    pub fn password(&self) -> &str {
        if self.builder.integrated_security {
            ""
        } else {
            &self.builder.password
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.builder.password = password.into();
        self.notify(SettingsField::Password);
        self.reset_test_result();
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.builder.integrated_security {
            AuthMode::Windows
        } else {
            AuthMode::SqlServer
        }
    }

    pub fn set_auth_mode(&mut self, mode: AuthMode) {
        self.set_use_integrated_auth(mode == AuthMode::Windows);
    }

    /// True when the server name is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.builder.data_source.is_empty()
    }

    /// True when a test may start: valid settings and no test in flight.
    pub fn can_test(&self) -> bool {
        self.is_valid() && !self.is_testing
    }

    /// True when the credential fields should be editable.
    pub fn credentials_enabled(&self) -> bool {
        !self.builder.integrated_security
    }

    pub fn is_testing(&self) -> bool {
        self.is_testing
    }

    /// Flags a test in flight. Does not clear the last result.
    pub fn set_testing(&mut self, value: bool) {
        self.is_testing = value;
        self.notify(SettingsField::TestingEnabled);
    }

    pub fn last_test_result(&self) -> &str {
        &self.last_test_result
    }

    pub fn set_last_test_result(&mut self, result: impl Into<String>) {
        self.last_test_result = result.into();
        self.notify(SettingsField::TestResult);
    }

    /// Registers an observer. Observers run synchronously on the mutating
    /// call, in registration order.
    pub fn subscribe(&mut self, observer: impl FnMut(SettingsField) + 'static) -> SubscriptionId {
        let id = Uuid::new_v4();
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes a previously registered observer. Returns false when the
    /// subscription is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Clone of the current descriptor, handed to the dialog's caller.
    pub fn descriptor(&self) -> ConnectionStringBuilder {
        self.builder.clone()
    }

    pub fn connection_string(&self) -> String {
        self.builder.connection_string()
    }

    fn reset_test_result(&mut self) {
        self.last_test_result.clear();
        self.notify(SettingsField::TestResult);
    }

    fn notify(&mut self, field: SettingsField) {
        debug!("Settings field changed: {:?}", field);

        for (_, observer) in &mut self.observers {
            observer(field);
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::new(ConnectionStringBuilder::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{AuthMode, ConnectionSettings, SettingsField};
    use crate::ConnectionStringBuilder;

    fn recording_settings() -> (ConnectionSettings, Rc<RefCell<Vec<SettingsField>>>) {
        let mut settings = ConnectionSettings::default().with_os_identity("CORP\\alice");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        settings.subscribe(move |field| sink.borrow_mut().push(field));
        (settings, seen)
    }

    #[test]
    fn empty_server_is_invalid_and_blocks_testing() {
        let mut settings = ConnectionSettings::new(ConnectionStringBuilder::new(""));

        assert!(!settings.is_valid());
        assert!(!settings.can_test());

        settings.set_server(".");

        assert!(settings.is_valid());
        assert!(settings.can_test());
    }

    #[test]
    fn integrated_auth_masks_credentials_without_overwriting() {
        let mut settings = ConnectionSettings::new(
            ConnectionStringBuilder::new(".").with_credentials("sa", "x"),
        )
        .with_os_identity("CORP\\alice");

        assert_eq!(settings.user_name(), "sa");
        assert_eq!(settings.password(), "x");

        settings.set_use_integrated_auth(true);
        assert_eq!(settings.user_name(), "CORP\\alice");
        assert_eq!(settings.password(), "");

        settings.set_use_integrated_auth(false);
        assert_eq!(settings.user_name(), "sa");
        assert_eq!(settings.password(), "x");
    }

    #[test]
    fn any_field_mutation_clears_last_test_result() {
        let mut settings = ConnectionSettings::default();

        let mutations: Vec<fn(&mut ConnectionSettings)> = vec![
            |s| s.set_server("other"),
            |s| s.set_use_integrated_auth(false),
            |s| s.set_user_name("sa"),
            |s| s.set_password("x"),
        ];

        for mutate in mutations {
            settings.set_last_test_result("Success");
            mutate(&mut settings);
            assert_eq!(settings.last_test_result(), "");
        }
    }

    #[test]
    fn server_setter_notifies_primary_then_derived_then_reset() {
        let (mut settings, seen) = recording_settings();

        settings.set_server("db1");

        assert_eq!(
            *seen.borrow(),
            vec![
                SettingsField::Server,
                SettingsField::ServerValid,
                SettingsField::TestingEnabled,
                SettingsField::TestResult,
            ]
        );
    }

    #[test]
    fn integrated_auth_setter_notifies_only_on_change() {
        let (mut settings, seen) = recording_settings();

        settings.set_use_integrated_auth(true);
        assert!(seen.borrow().is_empty());

        settings.set_use_integrated_auth(false);
        assert_eq!(
            *seen.borrow(),
            vec![
                SettingsField::IntegratedAuth,
                SettingsField::CredentialsEnabled,
                SettingsField::AuthenticationMode,
                SettingsField::TestResult,
            ]
        );
    }

    #[test]
    fn credential_setters_notify_field_then_reset() {
        let (mut settings, seen) = recording_settings();

        settings.set_user_name("sa");
        settings.set_password("x");

        assert_eq!(
            *seen.borrow(),
            vec![
                SettingsField::UserName,
                SettingsField::TestResult,
                SettingsField::Password,
                SettingsField::TestResult,
            ]
        );
    }

    #[test]
    fn observers_run_in_registration_order() {
        let mut settings = ConnectionSettings::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            settings.subscribe(move |field| {
                if field == SettingsField::Server {
                    sink.borrow_mut().push(tag);
                }
            });
        }

        settings.set_server("db1");

        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribed_observer_stops_receiving_notifications() {
        let mut settings = ConnectionSettings::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);

        let id = settings.subscribe(move |_| *sink.borrow_mut() += 1);

        settings.set_user_name("sa");
        let seen_before = *count.borrow();
        assert!(seen_before > 0);

        assert!(settings.unsubscribe(id));
        assert!(!settings.unsubscribe(id));

        settings.set_user_name("admin");
        assert_eq!(*count.borrow(), seen_before);
    }

    #[test]
    fn testing_flag_gates_can_test_without_clearing_result() {
        let mut settings = ConnectionSettings::default();
        settings.set_last_test_result("Success");

        settings.set_testing(true);
        assert!(!settings.can_test());
        assert_eq!(settings.last_test_result(), "Success");

        settings.set_testing(false);
        assert!(settings.can_test());
    }

    #[test]
    fn auth_mode_maps_to_integrated_flag_and_labels() {
        let mut settings = ConnectionSettings::default();

        assert_eq!(settings.auth_mode(), AuthMode::Windows);
        assert_eq!(settings.auth_mode().label(), "Windows Authentication");

        settings.set_auth_mode(AuthMode::SqlServer);
        assert!(!settings.use_integrated_auth());
        assert!(settings.credentials_enabled());

        assert_eq!(
            AuthMode::from_label("SQL Server Authentication"),
            Some(AuthMode::SqlServer)
        );
        assert_eq!(AuthMode::from_label("Kerberos"), None);
    }

    #[test]
    fn descriptor_reflects_current_builder_state() {
        let mut settings = ConnectionSettings::default();
        settings.set_server("db.example.com");
        settings.set_auth_mode(AuthMode::SqlServer);
        settings.set_user_name("sa");
        settings.set_password("x");

        let descriptor = settings.descriptor();
        assert_eq!(descriptor.data_source, "db.example.com");
        assert!(!descriptor.integrated_security);
        assert_eq!(descriptor.user_id, "sa");
        assert_eq!(descriptor.password, "x");
    }
}
