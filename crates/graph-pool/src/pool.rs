//! Connection pool implementation.
//!
//! The pool keeps a table of entries, one per connection, guarded by a single
//! mutex. The lock only covers bookkeeping: every network call (connect,
//! authenticate, ping, close) happens after an entry has been moved to a
//! non-idle state and the lock has been dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use graph_client::{
    AuthResponse, ConnectError, Connection, ErrorCode, ErrorHandler, GraphClientFactory, HostAddr,
    LogErrorHandler,
};
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};

use crate::config::{Config, InitSize, SizeScope};
use crate::error::PoolError;
use crate::policy::{AddressLoad, RoundRobin, SelectionPolicy};
use crate::session::{Lease, Session};

/// Name of the idle checker thread.
pub const IDLE_CHECK_THREAD_NAME: &str = "graph-pool-idle-check";

/// A pool of graph connections spread over several addresses.
///
/// # Example
///
/// ```rust,ignore
/// use graph_pool::{Config, ConnectionPool};
///
/// let mut pool = ConnectionPool::new(factory);
/// pool.init(["graphd1:9669", "graphd2:9669"], Config::new().min_connection_pool_size(2))?;
///
/// let session = pool.get_session("root", "nebula");
/// if session.valid() {
///     let resp = session.execute("YIELD 1");
///     println!("{:?}", resp.data);
/// }
/// // Dropping the session returns its connection to the pool.
///
/// let status = pool.status();
/// println!("Pool utilization: {:.1}%", status.utilization());
/// ```
pub struct ConnectionPool {
    factory: Arc<dyn GraphClientFactory>,
    error_handler: Arc<dyn ErrorHandler>,
    policy: Arc<dyn SelectionPolicy>,
    inner: OnceCell<Arc<PoolInner>>,
    checker: Mutex<Option<IdleChecker>>,
}

pub(crate) struct PoolInner {
    factory: Arc<dyn GraphClientFactory>,
    error_handler: Arc<dyn ErrorHandler>,
    policy: Arc<dyn SelectionPolicy>,
    config: Config,
    addresses: Vec<HostAddr>,
    state: Mutex<PoolState>,
    released: Condvar,
    closed: AtomicBool,
    next_entry_id: AtomicU64,
    created_at: Instant,
    metrics: Mutex<PoolMetricsInner>,
}

#[derive(Default)]
struct PoolState {
    entries: Vec<Entry>,
}

struct Entry {
    id: u64,
    address: usize,
    state: EntryState,
    created_at: Instant,
    last_used_at: Instant,
}

enum EntryState {
    Idle(Connection),
    Leased,
    Checking,
    Connecting,
}

impl PoolState {
    fn entry_mut(&mut self, id: u64) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    fn remove(&mut self, id: u64) -> Option<Entry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.swap_remove(pos))
    }
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
    health_checks_performed: u64,
    health_checks_failed: u64,
}

enum Reservation {
    Idle {
        id: u64,
        address: usize,
        conn: Connection,
    },
    New {
        id: u64,
        address: usize,
    },
}

impl ConnectionPool {
    /// Create an uninitialized pool that opens connections with `factory`.
    #[must_use]
    pub fn new(factory: Arc<dyn GraphClientFactory>) -> Self {
        Self {
            factory,
            error_handler: Arc::new(LogErrorHandler),
            policy: Arc::new(RoundRobin::new()),
            inner: OnceCell::new(),
            checker: Mutex::new(None),
        }
    }

    /// Replace the address selection policy. Takes effect at `init`.
    #[must_use]
    pub fn with_policy(mut self, policy: impl SelectionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the error handler given to every pooled connection.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Validate `config`, connect to `addresses` and fill the pool.
    ///
    /// Each address gets `max(1, min_connection_pool_size)` connections (under
    /// [`SizeScope::Total`] the minimum is spread over the addresses instead).
    /// With [`InitSize::Maximum`] the pool is filled to
    /// `max_connection_pool_size` connections spread round-robin over the
    /// addresses. Addresses that fail to parse or cannot produce one working connection
    /// are logged and left out. Returns the pool size.
    pub fn init<I, S>(&mut self, addresses: I, config: Config) -> Result<usize, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.inner.get().is_some() {
            return Err(PoolError::AlreadyInitialized);
        }
        config.validate()?;

        let options = config.connect_options();
        let open = |addr: &HostAddr| -> Result<Connection, ConnectError> {
            let mut conn = Connection::new(Arc::clone(&self.factory))
                .with_error_handler(Arc::clone(&self.error_handler));
            conn.open(addr, &options)?;
            Ok(conn)
        };

        // One trial connection per address decides whether it is kept.
        let mut reachable: Vec<(HostAddr, Vec<Connection>)> = Vec::new();
        for raw in addresses {
            let raw = raw.as_ref();
            let addr: HostAddr = match raw.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    tracing::warn!(address = raw, error = %e, "dropping invalid address");
                    continue;
                }
            };
            match open(&addr) {
                Ok(conn) => reachable.push((addr, vec![conn])),
                Err(e) => {
                    tracing::warn!(
                        host = addr.host(),
                        port = addr.port(),
                        error = %e,
                        "dropping unreachable address"
                    );
                }
            }
        }
        if reachable.is_empty() {
            return Err(PoolError::NoAvailableAddress);
        }

        let targets = initial_targets(&config, reachable.len());
        for ((addr, conns), target) in reachable.iter_mut().zip(&targets) {
            conns.truncate(*target);
            while conns.len() < *target {
                match open(addr) {
                    Ok(conn) => conns.push(conn),
                    Err(e) => {
                        tracing::warn!(
                            host = addr.host(),
                            port = addr.port(),
                            error = %e,
                            "failed to open initial connection"
                        );
                        break;
                    }
                }
            }
        }

        let now = Instant::now();
        let mut next_id = 1;
        let mut entries = Vec::new();
        let mut addrs = Vec::with_capacity(reachable.len());
        for (address, (addr, conns)) in reachable.into_iter().enumerate() {
            addrs.push(addr);
            for conn in conns {
                entries.push(Entry {
                    id: next_id,
                    address,
                    state: EntryState::Idle(conn),
                    created_at: now,
                    last_used_at: now,
                });
                next_id += 1;
            }
        }
        let size = entries.len();

        let inner = Arc::new(PoolInner {
            factory: Arc::clone(&self.factory),
            error_handler: Arc::clone(&self.error_handler),
            policy: Arc::clone(&self.policy),
            config,
            addresses: addrs,
            state: Mutex::new(PoolState { entries }),
            released: Condvar::new(),
            closed: AtomicBool::new(false),
            next_entry_id: AtomicU64::new(next_id),
            created_at: now,
            metrics: Mutex::new(PoolMetricsInner {
                connections_created: size as u64,
                ..PoolMetricsInner::default()
            }),
        });

        if !inner.config.idle_check_interval.is_zero() {
            let checker = IdleChecker::spawn(&inner)?;
            *self.checker.lock() = Some(checker);
        }

        tracing::info!(
            addresses = inner.addresses.len(),
            size,
            min = inner.config.min_connection_pool_size,
            max = inner.config.max_connection_pool_size,
            "connection pool initialized"
        );
        self.inner
            .set(inner)
            .map_err(|_| PoolError::AlreadyInitialized)?;
        Ok(size)
    }

    /// Lease a connection and authenticate.
    ///
    /// Never waits for a release: when every address is at its maximum the
    /// returned session is invalid.
    pub fn get_session(&self, username: &str, password: &str) -> Session {
        self.acquire(username, password, None)
    }

    /// Like [`get_session`](Self::get_session), but waits up to `wait` for a
    /// session to be released when the pool is exhausted.
    pub fn get_session_timeout(&self, username: &str, password: &str, wait: Duration) -> Session {
        self.acquire(username, password, Some(Instant::now() + wait))
    }

    fn acquire(&self, username: &str, password: &str, deadline: Option<Instant>) -> Session {
        match self.inner.get() {
            Some(inner) => inner.acquire(username, password, deadline),
            None => {
                tracing::debug!("session requested from uninitialized pool");
                Session::default()
            }
        }
    }

    /// Number of connections: idle, leased and under health check.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.get().map_or(0, |inner| inner.status().total as usize)
    }

    /// Snapshot of the pool's occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.inner
            .get()
            .map_or_else(PoolStatus::default, |inner| inner.status())
    }

    /// Pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.inner
            .get()
            .map_or_else(PoolMetrics::default, |inner| inner.metrics())
    }

    /// Addresses kept by `init`.
    #[must_use]
    pub fn addresses(&self) -> &[HostAddr] {
        match self.inner.get() {
            Some(inner) => &inner.addresses,
            None => &[],
        }
    }

    /// Pool configuration, once initialized.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.inner.get().map(|inner| &inner.config)
    }

    /// Run one idle check now, regardless of the configured interval.
    pub fn check_idle(&self) {
        if let Some(inner) = self.inner.get() {
            inner.check_idle();
        }
    }

    /// Stop the idle checker and close idle connections.
    ///
    /// Outstanding sessions keep working; their connections are closed when
    /// they are released. Idempotent.
    pub fn close(&self) {
        if let Some(checker) = self.checker.lock().take() {
            checker.stop();
        }
        if let Some(inner) = self.inner.get() {
            inner.close();
        }
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner
            .get()
            .is_some_and(|inner| inner.closed.load(Ordering::Acquire))
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("policy", &self.policy)
            .field("status", &self.status())
            .finish()
    }
}

/// Connections each address starts with.
fn initial_targets(config: &Config, addresses: usize) -> Vec<usize> {
    let min = config.min_connection_pool_size as usize;
    let max = config.max_connection_pool_size as usize;
    match (config.init_size, config.size_scope) {
        (InitSize::Maximum, _) => spread(max, addresses, max),
        (InitSize::Minimum, SizeScope::PerAddress) => vec![min.max(1); addresses],
        (InitSize::Minimum, SizeScope::Total) => spread(min, addresses, max),
    }
}

/// Deal `count` connections round-robin over `addresses`. The first `cap`
/// addresses keep at least their trial connection; trial connections beyond `cap` are
/// closed again.
fn spread(count: usize, addresses: usize, cap: usize) -> Vec<usize> {
    (0..addresses)
        .map(|i| {
            let share = count / addresses + usize::from(i < count % addresses);
            if i < cap { share.max(1) } else { 0 }
        })
        .collect()
}

fn session_id_of(auth: &AuthResponse) -> Result<i64, ErrorCode> {
    match (auth.error_code, auth.session_id) {
        (ErrorCode::Succeeded, Some(id)) => Ok(id),
        (ErrorCode::Succeeded, None) => Err(ErrorCode::SessionInvalid),
        (code, _) => Err(code),
    }
}

impl PoolInner {
    fn max_size(&self) -> usize {
        self.config.max_connection_pool_size as usize
    }

    fn loads(&self, state: &PoolState) -> Vec<AddressLoad> {
        // Entries under health check do not block growth; a checked entry is
        // closed instead of returned if the pool grew past its maximum.
        let pool_total = state
            .entries
            .iter()
            .filter(|e| !matches!(e.state, EntryState::Checking))
            .count();
        (0..self.addresses.len())
            .map(|index| {
                let mut load = AddressLoad {
                    index,
                    ..AddressLoad::default()
                };
                let mut checking = 0;
                for entry in state.entries.iter().filter(|e| e.address == index) {
                    load.total += 1;
                    match entry.state {
                        EntryState::Idle(_) => load.idle += 1,
                        EntryState::Leased | EntryState::Connecting => load.leased += 1,
                        EntryState::Checking => checking += 1,
                    }
                }
                let can_grow = match self.config.size_scope {
                    SizeScope::PerAddress => load.total - checking < self.max_size(),
                    SizeScope::Total => pool_total < self.max_size(),
                };
                load.available = load.idle > 0 || can_grow;
                load
            })
            .collect()
    }

    /// Entries counted against the minimum for `address`.
    fn scope_count(&self, state: &PoolState, address: usize) -> usize {
        match self.config.size_scope {
            SizeScope::PerAddress => state.entries.iter().filter(|e| e.address == address).count(),
            SizeScope::Total => state.entries.len(),
        }
    }

    fn reserve(&self, state: &mut PoolState) -> Option<Reservation> {
        let address = self.policy.select(&self.loads(state))?;

        let idle = state
            .entries
            .iter_mut()
            .filter(|e| e.address == address && matches!(e.state, EntryState::Idle(_)))
            .min_by_key(|e| e.last_used_at);
        if let Some(entry) = idle {
            if let EntryState::Idle(conn) = std::mem::replace(&mut entry.state, EntryState::Leased)
            {
                entry.last_used_at = Instant::now();
                return Some(Reservation::Idle {
                    id: entry.id,
                    address,
                    conn,
                });
            }
        }

        let id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        state.entries.push(Entry {
            id,
            address,
            state: EntryState::Connecting,
            created_at: now,
            last_used_at: now,
        });
        Some(Reservation::New { id, address })
    }

    fn acquire(
        self: &Arc<Self>,
        username: &str,
        password: &str,
        deadline: Option<Instant>,
    ) -> Session {
        let reservation = {
            let mut state = self.state.lock();
            loop {
                if self.closed.load(Ordering::Acquire) {
                    break None;
                }
                if let Some(reservation) = self.reserve(&mut state) {
                    break Some(reservation);
                }
                let Some(deadline) = deadline else {
                    break None;
                };
                if self.released.wait_until(&mut state, deadline).timed_out() {
                    break if self.closed.load(Ordering::Acquire) {
                        None
                    } else {
                        self.reserve(&mut state)
                    };
                }
            }
        };

        let Some(reservation) = reservation else {
            self.metrics.lock().checkouts_failed += 1;
            tracing::debug!("no connection available for a new session");
            return Session::default();
        };

        let (id, address, conn) = match reservation {
            Reservation::Idle { id, address, conn } => (id, address, conn),
            Reservation::New { id, address } => match self.open(address) {
                Ok(conn) => {
                    self.mark_leased(id);
                    (id, address, conn)
                }
                Err(e) => {
                    tracing::debug!(entry_id = id, error = %e, "failed to open pooled connection");
                    self.discard(id);
                    self.metrics.lock().checkouts_failed += 1;
                    return Session::default();
                }
            },
        };

        let auth = conn.authenticate(username, password);
        match session_id_of(&auth) {
            Ok(session_id) => {
                self.metrics.lock().checkouts_successful += 1;
                let host = self.addresses[address].clone();
                tracing::debug!(
                    entry_id = id,
                    session_id,
                    host = host.host(),
                    port = host.port(),
                    "session leased"
                );
                Session::new(
                    Arc::downgrade(self),
                    Lease {
                        entry_id: id,
                        host,
                        conn,
                        session_id,
                    },
                    username,
                    password,
                )
            }
            Err(code) => {
                tracing::debug!(
                    entry_id = id,
                    code = %code,
                    error = auth.error_msg.as_deref().unwrap_or_default(),
                    "authentication failed"
                );
                if code.is_transport_failure() {
                    self.discard(id);
                    self.close_connection(conn);
                } else {
                    self.give_back(id, conn);
                }
                self.metrics.lock().checkouts_failed += 1;
                Session::default()
            }
        }
    }

    fn open(&self, address: usize) -> Result<Connection, ConnectError> {
        let mut conn = Connection::new(Arc::clone(&self.factory))
            .with_error_handler(Arc::clone(&self.error_handler));
        conn.open(&self.addresses[address], &self.config.connect_options())?;
        self.metrics.lock().connections_created += 1;
        Ok(conn)
    }

    /// Open a replacement connection for a leased entry.
    pub(crate) fn reopen(&self, host: &HostAddr) -> Result<Connection, ConnectError> {
        let mut conn = Connection::new(Arc::clone(&self.factory))
            .with_error_handler(Arc::clone(&self.error_handler));
        conn.open(host, &self.config.connect_options())?;
        self.metrics.lock().connections_created += 1;
        Ok(conn)
    }

    fn mark_leased(&self, id: u64) {
        if let Some(entry) = self.state.lock().entry_mut(id) {
            entry.state = EntryState::Leased;
        }
    }

    /// Drop a leased or connecting entry, freeing its capacity.
    pub(crate) fn discard(&self, id: u64) {
        let removed = self.state.lock().remove(id);
        self.released.notify_one();
        if let Some(entry) = removed {
            tracing::debug!(
                entry_id = id,
                age_ms = entry.created_at.elapsed().as_millis() as u64,
                "pool entry discarded"
            );
        }
    }

    /// Return a leased connection. Closes it instead if the pool is closed.
    pub(crate) fn give_back(&self, id: u64, conn: Connection) {
        let leftover = {
            let mut state = self.state.lock();
            if self.closed.load(Ordering::Acquire) {
                state.remove(id);
                Some(conn)
            } else if let Some(entry) = state.entry_mut(id) {
                entry.state = EntryState::Idle(conn);
                entry.last_used_at = Instant::now();
                None
            } else {
                Some(conn)
            }
        };
        self.released.notify_one();
        if let Some(conn) = leftover {
            self.close_connection(conn);
        }
    }

    pub(crate) fn close_connection(&self, mut conn: Connection) {
        conn.close();
        self.metrics.lock().connections_closed += 1;
    }

    /// Health-check idle entries one at a time.
    ///
    /// Only the entry being pinged is unavailable, so sessions keep being
    /// served from the rest of the pool during the sweep.
    fn check_idle(&self) {
        let candidates: Vec<u64> = self
            .state
            .lock()
            .entries
            .iter()
            .filter(|e| matches!(e.state, EntryState::Idle(_)))
            .map(|e| e.id)
            .collect();

        let mut closed = 0usize;
        for id in candidates {
            let Some((address, last_used_at, conn)) = self.take_for_check(id) else {
                continue;
            };

            let alive = conn.ping();
            if !alive {
                let host = &self.addresses[address];
                tracing::warn!(
                    entry_id = id,
                    host = host.host(),
                    port = host.port(),
                    "idle connection failed health check"
                );
            }

            if let Some(conn) = self.finish_check(id, address, last_used_at, conn, alive) {
                self.close_connection(conn);
                closed += 1;
            }
        }

        if closed > 0 {
            tracing::debug!(count = closed, "closed idle connections");
        }
    }

    /// Move one idle entry to `Checking` and hand out its connection.
    fn take_for_check(&self, id: u64) -> Option<(usize, Instant, Connection)> {
        let mut state = self.state.lock();
        let entry = state.entry_mut(id)?;
        match std::mem::replace(&mut entry.state, EntryState::Checking) {
            EntryState::Idle(conn) => Some((entry.address, entry.last_used_at, conn)),
            other => {
                entry.state = other;
                None
            }
        }
    }

    /// Put a checked connection back, or return it for closing.
    fn finish_check(
        &self,
        id: u64,
        address: usize,
        last_used_at: Instant,
        conn: Connection,
        alive: bool,
    ) -> Option<Connection> {
        let expired = !self.config.idle_time.is_zero()
            && last_used_at.elapsed() > self.config.idle_time;
        let min = self.config.min_connection_pool_size as usize;

        let leftover = {
            let mut state = self.state.lock();
            {
                let mut metrics = self.metrics.lock();
                metrics.health_checks_performed += 1;
                if !alive {
                    metrics.health_checks_failed += 1;
                }
            }
            let count = self.scope_count(&state, address);
            let drop_it = self.closed.load(Ordering::Acquire)
                || !alive
                || count > self.max_size()
                || (expired && count > min);
            if drop_it {
                state.remove(id);
                Some(conn)
            } else if let Some(entry) = state.entry_mut(id) {
                entry.state = EntryState::Idle(conn);
                None
            } else {
                Some(conn)
            }
        };
        self.released.notify_all();
        leftover
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let idle: Vec<Connection> = {
            let mut state = self.state.lock();
            let mut idle = Vec::new();
            state.entries.retain_mut(|e| {
                match std::mem::replace(&mut e.state, EntryState::Checking) {
                    EntryState::Idle(conn) => {
                        idle.push(conn);
                        false
                    }
                    other => {
                        e.state = other;
                        true
                    }
                }
            });
            idle
        };
        self.released.notify_all();
        for conn in idle {
            self.close_connection(conn);
        }
        tracing::info!("connection pool closed");
    }

    fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        let mut status = PoolStatus {
            max: match self.config.size_scope {
                SizeScope::PerAddress => self.max_size() * self.addresses.len(),
                SizeScope::Total => self.max_size(),
            } as u32,
            ..PoolStatus::default()
        };
        for entry in &state.entries {
            match entry.state {
                EntryState::Idle(_) => status.idle += 1,
                EntryState::Leased => status.leased += 1,
                EntryState::Checking => {}
                EntryState::Connecting => continue,
            }
            status.total += 1;
        }
        status
    }

    fn metrics(&self) -> PoolMetrics {
        let inner = self.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            health_checks_performed: inner.health_checks_performed,
            health_checks_failed: inner.health_checks_failed,
            uptime: self.created_at.elapsed(),
        }
    }
}

/// Background thread running [`PoolInner::check_idle`].
struct IdleChecker {
    stop: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl IdleChecker {
    fn spawn(inner: &Arc<PoolInner>) -> Result<Self, PoolError> {
        let interval = inner.config.idle_check_interval;
        let pool: Weak<PoolInner> = Arc::downgrade(inner);
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name(IDLE_CHECK_THREAD_NAME.to_string())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => match pool.upgrade() {
                            Some(inner) => inner.check_idle(),
                            None => break,
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::trace!("idle checker stopped");
            })
            .map_err(PoolError::Spawn)?;
        Ok(Self { stop, thread })
    }

    fn stop(self) {
        let _ = self.stop.send(());
        if self.thread.thread().id() != thread::current().id() {
            let _ = self.thread.join();
        }
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle connections.
    pub idle: u32,
    /// Connections leased to sessions.
    pub leased: u32,
    /// Idle, leased and under-check connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (f64::from(self.leased) / f64::from(self.max)) * 100.0
    }

    /// Check if the pool is at capacity.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.total >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone, Default)]
pub struct PoolMetrics {
    /// Total connections created since pool start.
    pub connections_created: u64,
    /// Total connections closed since pool start.
    pub connections_closed: u64,
    /// Sessions handed out.
    pub checkouts_successful: u64,
    /// Session requests that returned an invalid session.
    pub checkouts_failed: u64,
    /// Idle health checks performed.
    pub health_checks_performed: u64,
    /// Idle health checks that failed.
    pub health_checks_failed: u64,
    /// Time since pool creation.
    pub uptime: Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }

    /// Calculate health check success rate (0.0 to 1.0).
    #[must_use]
    pub fn health_check_success_rate(&self) -> f64 {
        if self.health_checks_performed == 0 {
            return 1.0;
        }
        let successful = self.health_checks_performed - self.health_checks_failed;
        successful as f64 / self.health_checks_performed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_utilization() {
        let status = PoolStatus {
            idle: 5,
            leased: 5,
            total: 10,
            max: 20,
        };
        assert!((status.utilization() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_status_at_capacity() {
        let status = PoolStatus {
            idle: 0,
            leased: 10,
            total: 10,
            max: 10,
        };
        assert!(status.is_at_capacity());
        assert!(!PoolStatus { max: 20, ..status }.is_at_capacity());
    }

    #[test]
    fn test_pool_metrics_success_rates() {
        let metrics = PoolMetrics {
            checkouts_successful: 90,
            checkouts_failed: 10,
            health_checks_performed: 100,
            health_checks_failed: 5,
            ..PoolMetrics::default()
        };
        assert!((metrics.checkout_success_rate() - 0.9).abs() < f64::EPSILON);
        assert!((metrics.health_check_success_rate() - 0.95).abs() < f64::EPSILON);
        assert!((PoolMetrics::default().checkout_success_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_initial_targets_per_address() {
        let config = Config::new().min_connection_pool_size(3);
        assert_eq!(initial_targets(&config, 2), vec![3, 3]);
        assert_eq!(initial_targets(&Config::new(), 3), vec![1, 1, 1]);
    }

    #[test]
    fn test_initial_targets_total() {
        let config = Config::new()
            .min_connection_pool_size(5)
            .size_scope(SizeScope::Total);
        assert_eq!(initial_targets(&config, 2), vec![3, 2]);
        let config = Config::new()
            .max_connection_pool_size(2)
            .size_scope(SizeScope::Total);
        assert_eq!(initial_targets(&config, 3), vec![1, 1, 0]);
    }

    #[test]
    fn test_initial_targets_fill() {
        let config = Config::new().init_size(InitSize::Maximum);
        assert_eq!(initial_targets(&config, 1), vec![10]);
        assert_eq!(initial_targets(&config, 3), vec![4, 3, 3]);
        let config = config.max_connection_pool_size(2);
        assert_eq!(initial_targets(&config, 3), vec![1, 1, 0]);
    }

    #[test]
    fn test_session_id_of() {
        assert_eq!(session_id_of(&AuthResponse::succeeded(4)), Ok(4));
        assert_eq!(
            session_id_of(&AuthResponse::error(ErrorCode::BadUsernamePassword, "no")),
            Err(ErrorCode::BadUsernamePassword)
        );
    }

    #[test]
    fn test_uninitialized_pool() {
        let factory: Arc<dyn GraphClientFactory> =
            Arc::new(|_: graph_client::LinkChannel| -> Arc<dyn graph_client::GraphClient> {
                unreachable!("no connection is opened")
            });
        let pool = ConnectionPool::new(factory);
        assert_eq!(pool.size(), 0);
        assert!(!pool.get_session("root", "nebula").valid());
        assert!(pool.addresses().is_empty());
        assert_eq!(pool.status(), PoolStatus::default());
        pool.close();
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let factory: Arc<dyn GraphClientFactory> =
            Arc::new(|_: graph_client::LinkChannel| -> Arc<dyn graph_client::GraphClient> {
                unreachable!("no connection is opened")
            });
        let mut pool = ConnectionPool::new(factory);
        let err = pool
            .init(["127.0.0.1:1"], Config::new().max_connection_pool_size(0))
            .unwrap_err();
        assert!(matches!(err, PoolError::Config(_)));
        let err = pool.init(["not-an-address"], Config::new()).unwrap_err();
        assert!(matches!(err, PoolError::NoAvailableAddress));
    }
}
