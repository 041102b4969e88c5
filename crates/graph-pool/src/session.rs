//! Sessions leased from the pool.

use std::sync::Weak;

use graph_client::{
    ClientError, Connection, ErrorCode, ExecutionResponse, HostAddr, ParameterMap,
};

use crate::pool::PoolInner;

/// A leased connection bound to an authenticated server session.
pub(crate) struct Lease {
    pub(crate) entry_id: u64,
    pub(crate) host: HostAddr,
    pub(crate) conn: Connection,
    pub(crate) session_id: i64,
}

/// An authenticated session on a pooled connection.
///
/// Obtained from [`ConnectionPool::get_session`](crate::ConnectionPool::get_session).
/// A session that could not be established is *invalid*: every request
/// answers [`ErrorCode::Disconnected`] without touching the network.
///
/// Sessions are not `Clone`. Dropping one releases it.
#[derive(Default)]
pub struct Session {
    pool: Weak<PoolInner>,
    lease: Option<Lease>,
    username: String,
    password: String,
}

impl Session {
    pub(crate) fn new(pool: Weak<PoolInner>, lease: Lease, username: &str, password: &str) -> Self {
        Self {
            pool,
            lease: Some(lease),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Whether the session holds a connection.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.lease.is_some()
    }

    /// Server-assigned session id.
    #[must_use]
    pub fn session_id(&self) -> Option<i64> {
        self.lease.as_ref().map(|l| l.session_id)
    }

    /// Address of the leased connection.
    #[must_use]
    pub fn address(&self) -> Option<&HostAddr> {
        self.lease.as_ref().map(|l| &l.host)
    }

    /// Execute a statement.
    pub fn execute(&self, stmt: &str) -> ExecutionResponse {
        match &self.lease {
            Some(l) => l.conn.execute(l.session_id, stmt),
            None => ExecutionResponse::disconnected(),
        }
    }

    /// Execute a statement with named parameters.
    pub fn execute_with_parameter(&self, stmt: &str, params: &ParameterMap) -> ExecutionResponse {
        match &self.lease {
            Some(l) => l.conn.execute_with_parameter(l.session_id, stmt, params),
            None => ExecutionResponse::disconnected(),
        }
    }

    /// Execute a statement and return JSON text; empty on any failure.
    pub fn execute_json(&self, stmt: &str) -> String {
        match &self.lease {
            Some(l) => l.conn.execute_json(l.session_id, stmt),
            None => String::new(),
        }
    }

    /// Parameterized variant of [`execute_json`](Self::execute_json).
    pub fn execute_json_with_parameter(&self, stmt: &str, params: &ParameterMap) -> String {
        match &self.lease {
            Some(l) => l.conn.execute_json_with_parameter(l.session_id, stmt, params),
            None => String::new(),
        }
    }

    /// Execute a statement and return JSON text or the failure.
    pub fn try_execute_json(&self, stmt: &str) -> Result<String, ClientError> {
        match &self.lease {
            Some(l) => l.conn.try_execute_json(l.session_id, stmt),
            None => Err(ClientError::Disconnected),
        }
    }

    /// Parameterized variant of [`try_execute_json`](Self::try_execute_json).
    pub fn try_execute_json_with_parameter(
        &self,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<String, ClientError> {
        match &self.lease {
            Some(l) => l
                .conn
                .try_execute_json_with_parameter(l.session_id, stmt, params),
            None => Err(ClientError::Disconnected),
        }
    }

    /// Execute a statement; `callback` runs on the connection's event loop.
    ///
    /// On an invalid session the callback runs immediately with a
    /// `Disconnected` response.
    pub fn async_execute<C>(&self, stmt: &str, callback: C)
    where
        C: FnOnce(ExecutionResponse) + Send + 'static,
    {
        match &self.lease {
            Some(l) => l.conn.async_execute(l.session_id, stmt, callback),
            None => callback(ExecutionResponse::disconnected()),
        }
    }

    /// Parameterized variant of [`async_execute`](Self::async_execute).
    pub fn async_execute_with_parameter<C>(&self, stmt: &str, params: &ParameterMap, callback: C)
    where
        C: FnOnce(ExecutionResponse) + Send + 'static,
    {
        match &self.lease {
            Some(l) => l
                .conn
                .async_execute_with_parameter(l.session_id, stmt, params, callback),
            None => callback(ExecutionResponse::disconnected()),
        }
    }

    /// Callback variant of [`execute_json`](Self::execute_json).
    pub fn async_execute_json<C>(&self, stmt: &str, callback: C)
    where
        C: FnOnce(String) + Send + 'static,
    {
        match &self.lease {
            Some(l) => l.conn.async_execute_json(l.session_id, stmt, callback),
            None => callback(String::new()),
        }
    }

    /// Callback variant of
    /// [`execute_json_with_parameter`](Self::execute_json_with_parameter).
    pub fn async_execute_json_with_parameter<C>(
        &self,
        stmt: &str,
        params: &ParameterMap,
        callback: C,
    ) where
        C: FnOnce(String) + Send + 'static,
    {
        match &self.lease {
            Some(l) => l
                .conn
                .async_execute_json_with_parameter(l.session_id, stmt, params, callback),
            None => callback(String::new()),
        }
    }

    /// Whether the connection answers.
    pub fn ping(&self) -> bool {
        self.lease.as_ref().is_some_and(|l| l.conn.ping())
    }

    /// Reconnect to the same address and sign in again.
    ///
    /// Returns `Succeeded` with a new session id installed. On failure the
    /// session becomes invalid and its pool entry is removed.
    pub fn retry_connect(&mut self) -> ErrorCode {
        let Self {
            pool,
            lease,
            username,
            password,
        } = self;
        let Some(current) = lease.as_mut() else {
            return ErrorCode::Disconnected;
        };
        let Some(pool) = pool.upgrade() else {
            tracing::debug!(session_id = current.session_id, "pool gone, cannot reconnect");
            *lease = None;
            return ErrorCode::Disconnected;
        };

        current.conn.signout(current.session_id);
        pool.close_connection(current.conn.take());

        let result = pool
            .reopen(&current.host)
            .map_err(|e| {
                tracing::debug!(
                    host = current.host.host(),
                    port = current.host.port(),
                    error = %e,
                    "reconnect failed"
                );
                ErrorCode::FailToConnect
            })
            .and_then(|conn| {
                let auth = conn.authenticate(username, password);
                match (auth.error_code, auth.session_id) {
                    (ErrorCode::Succeeded, Some(id)) => Ok((conn, id)),
                    (code, _) => {
                        pool.close_connection(conn);
                        Err(if code.is_succeeded() {
                            ErrorCode::SessionInvalid
                        } else {
                            code
                        })
                    }
                }
            });

        match result {
            Ok((conn, session_id)) => {
                tracing::debug!(
                    entry_id = current.entry_id,
                    old_session_id = current.session_id,
                    session_id,
                    "session reconnected"
                );
                current.conn = conn;
                current.session_id = session_id;
                ErrorCode::Succeeded
            }
            Err(code) => {
                pool.discard(current.entry_id);
                *lease = None;
                code
            }
        }
    }

    /// Sign out and return the connection to the pool. Idempotent.
    pub fn release(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        lease.conn.signout(lease.session_id);
        tracing::debug!(
            entry_id = lease.entry_id,
            session_id = lease.session_id,
            "session released"
        );
        match self.pool.upgrade() {
            Some(pool) => pool.give_back(lease.entry_id, lease.conn),
            None => drop(lease),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("valid", &self.valid())
            .field("session_id", &self.session_id())
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_invalid_session() {
        let mut session = Session::default();
        assert!(!session.valid());
        assert_eq!(session.session_id(), None);
        assert!(session.address().is_none());
        assert_eq!(session.execute("YIELD 1").error_code, ErrorCode::Disconnected);
        assert_eq!(
            session
                .execute_with_parameter("YIELD 1", &ParameterMap::new())
                .error_code,
            ErrorCode::Disconnected
        );
        assert_eq!(session.execute_json("YIELD 1"), "");
        assert!(matches!(
            session.try_execute_json("YIELD 1"),
            Err(ClientError::Disconnected)
        ));
        assert!(!session.ping());
        assert_eq!(session.retry_connect(), ErrorCode::Disconnected);
        session.release();
        session.release();
    }

    #[test]
    fn test_invalid_session_callback_runs_inline() {
        let session = Session::default();
        let (tx, rx) = mpsc::channel();
        session.async_execute("YIELD 1", move |resp| {
            let _ = tx.send(resp.error_code);
        });
        assert_eq!(rx.try_recv().unwrap(), ErrorCode::Disconnected);

        let (tx, rx) = mpsc::channel();
        session.async_execute_json("YIELD 1", move |text| {
            let _ = tx.send(text);
        });
        assert_eq!(rx.try_recv().unwrap(), "");
    }
}
