use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sqlprobe_core::{ConnectError, Connection, ConnectionStringBuilder, Driver};

/// Snapshot of everything the fake driver observed.
#[derive(Debug, Clone, Default)]
pub struct FakeDriverStats {
    pub connect_calls: usize,
    pub ping_calls: usize,
    pub close_calls: usize,
    pub seen_connection_strings: Vec<String>,
}

#[derive(Default)]
struct FakeDriverState {
    connect_error: RwLock<Option<String>>,
    ping_error: RwLock<Option<String>>,
    connect_calls: AtomicUsize,
    ping_calls: AtomicUsize,
    close_calls: AtomicUsize,
    seen_connection_strings: Mutex<Vec<String>>,
}

/// Deterministic in-memory driver for dialog and tester tests.
///
/// Clones share state, so a test can keep one handle for assertions while
/// handing another to the code under test.
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<FakeDriverState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent connect attempt fails with this message.
    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.connect_error) = Some(message.into());
        self
    }

    /// Connects succeed, but every ping fails with this message.
    pub fn with_ping_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.ping_error) = Some(message.into());
        self
    }

    pub fn stats(&self) -> FakeDriverStats {
        FakeDriverStats {
            connect_calls: self.state.connect_calls.load(Ordering::Relaxed),
            ping_calls: self.state.ping_calls.load(Ordering::Relaxed),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
            seen_connection_strings: mutex_lock(&self.state.seen_connection_strings).clone(),
        }
    }

    pub fn as_driver_arc(self) -> Arc<dyn Driver> {
        Arc::new(self)
    }
}

impl Driver for FakeDriver {
    fn display_name(&self) -> &'static str {
        "Fake SQL Server"
    }

    fn connect(
        &self,
        descriptor: &ConnectionStringBuilder,
    ) -> Result<Box<dyn Connection>, ConnectError> {
        self.state.connect_calls.fetch_add(1, Ordering::Relaxed);
        mutex_lock(&self.state.seen_connection_strings).push(descriptor.connection_string());

        if let Some(message) = rwlock_read(&self.state.connect_error).clone() {
            return Err(ConnectError::ConnectionFailed(message));
        }

        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    state: Arc<FakeDriverState>,
}

impl Connection for FakeConnection {
    fn ping(&self) -> Result<(), ConnectError> {
        self.state.ping_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = rwlock_read(&self.state.ping_error).clone() {
            return Err(ConnectError::ConnectionFailed(message));
        }

        Ok(())
    }

    fn close(&mut self) -> Result<(), ConnectError> {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
