//! In-memory simulated database server
//!
//! Models just enough server state (users, databases with owners, grants) to
//! run the real dialect statements against it. Handles are cheap clones of a
//! shared state, so a test keeps one handle to inspect the server while the
//! provisioner drives another.

use super::{Action, Connector, SqlSession, Statement};
use crate::dialect::DialectFamily;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type FailurePredicate = Box<dyn Fn(&Action) -> bool + Send + Sync>;

#[derive(Default)]
struct ServerState {
    users: BTreeSet<String>,
    databases: BTreeMap<String, String>,
    grants: BTreeSet<(String, String)>,
    password_sets: HashMap<String, u32>,
    flushes: u32,
    executed: Vec<Action>,
    failures: Vec<FailurePredicate>,
    refused_connections: u32,
    failed_pings: u32,
    connects: u32,
    closes: u32,
}

/// Observable server state, comparable across runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Existing users
    pub users: BTreeSet<String>,
    /// Database name to owner
    pub databases: BTreeMap<String, String>,
    /// (database, user) pairs holding all privileges
    pub grants: BTreeSet<(String, String)>,
}

/// A simulated database server
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl std::fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryServer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl MemoryServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-create a user
    #[must_use]
    pub fn with_user(self, user: impl Into<String>) -> Self {
        self.lock().users.insert(user.into());
        self
    }

    /// Pre-create a database owned by `owner`
    #[must_use]
    pub fn with_database(self, database: impl Into<String>, owner: impl Into<String>) -> Self {
        self.lock().databases.insert(database.into(), owner.into());
        self
    }

    /// Refuse the next `count` connection attempts
    #[must_use]
    pub fn refuse_connections(self, count: u32) -> Self {
        self.lock().refused_connections = count;
        self
    }

    /// Fail the liveness probe on the next `count` sessions
    #[must_use]
    pub fn fail_pings(self, count: u32) -> Self {
        self.lock().failed_pings = count;
        self
    }

    /// Reject every statement matching `predicate` with a permission error
    #[must_use]
    pub fn fail_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Action) -> bool + Send + Sync + 'static,
    {
        self.lock().failures.push(Box::new(predicate));
        self
    }

    /// Current users, databases and grants
    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.lock();
        MemorySnapshot {
            users: state.users.clone(),
            databases: state.databases.clone(),
            grants: state.grants.clone(),
        }
    }

    /// Owner of a database, if it exists
    pub fn owner_of(&self, database: &str) -> Option<String> {
        self.lock().databases.get(database).cloned()
    }

    /// Every statement executed so far, in order
    pub fn executed(&self) -> Vec<Action> {
        self.lock().executed.clone()
    }

    /// Forget the executed statement log
    pub fn clear_executed(&self) {
        self.lock().executed.clear();
    }

    /// How many times a user's password was set
    pub fn password_sets(&self, user: &str) -> u32 {
        self.lock().password_sets.get(user).copied().unwrap_or(0)
    }

    /// How many privilege reloads were issued
    pub fn flushes(&self) -> u32 {
        self.lock().flushes
    }

    /// Successful connection count
    pub fn connects(&self) -> u32 {
        self.lock().connects
    }

    /// Closed session count
    pub fn closes(&self) -> u32 {
        self.lock().closes
    }

    /// Open a session directly
    pub fn session(&self) -> Result<MemorySession> {
        let mut state = self.lock();
        if state.refused_connections > 0 {
            state.refused_connections -= 1;
            return Err(Error::connect_attempt("connection refused"));
        }
        state.connects += 1;
        Ok(MemorySession {
            server: self.clone(),
        })
    }

    fn apply(&self, action: &Action) -> Result<u64> {
        let mut state = self.lock();

        if state.failures.iter().any(|fails| fails(action)) {
            return Err(Error::statement("permission denied"));
        }

        state.executed.push(action.clone());

        match action {
            Action::UserExists { .. } | Action::DatabaseExists { .. } => Ok(0),
            Action::CreateUser { user } => {
                if !state.users.insert(user.clone()) {
                    return Err(Error::statement(format!("role \"{user}\" already exists")));
                }
                *state.password_sets.entry(user.clone()).or_default() += 1;
                Ok(0)
            }
            Action::AlterPassword { user } => {
                if !state.users.contains(user) {
                    return Err(Error::statement(format!("role \"{user}\" does not exist")));
                }
                *state.password_sets.entry(user.clone()).or_default() += 1;
                Ok(0)
            }
            Action::CreateDatabase {
                database,
                owner,
                if_not_exists,
            } => {
                if state.databases.contains_key(database) {
                    return if *if_not_exists {
                        Ok(0)
                    } else {
                        Err(Error::statement(format!(
                            "database \"{database}\" already exists"
                        )))
                    };
                }
                let owner = owner.clone().unwrap_or_else(|| "root".to_string());
                state.databases.insert(database.clone(), owner);
                Ok(1)
            }
            Action::AlterOwner { database, owner } => {
                if !state.users.contains(owner) {
                    return Err(Error::statement(format!("role \"{owner}\" does not exist")));
                }
                match state.databases.get_mut(database) {
                    Some(current) => {
                        current.clone_from(owner);
                        Ok(0)
                    }
                    None => Err(Error::statement(format!(
                        "database \"{database}\" does not exist"
                    ))),
                }
            }
            Action::Grant { database, user } => {
                if !state.users.contains(user) {
                    return Err(Error::statement(format!("role \"{user}\" does not exist")));
                }
                state.grants.insert((database.clone(), user.clone()));
                Ok(0)
            }
            Action::FlushPrivileges => {
                state.flushes += 1;
                Ok(0)
            }
        }
    }

    fn exists(&self, action: &Action) -> Result<bool> {
        self.apply(action)?;
        let state = self.lock();
        match action {
            Action::UserExists { user } => Ok(state.users.contains(user)),
            Action::DatabaseExists { database } => Ok(state.databases.contains_key(database)),
            other => Err(Error::query(format!("not an existence query: {other:?}"))),
        }
    }
}

/// A session on a [`MemoryServer`]
#[derive(Debug)]
pub struct MemorySession {
    server: MemoryServer,
}

#[async_trait]
impl SqlSession for MemorySession {
    async fn ping(&mut self) -> Result<()> {
        let mut state = self.server.lock();
        if state.failed_pings > 0 {
            state.failed_pings -= 1;
            return Err(Error::connect_attempt("server is starting up"));
        }
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        self.server.apply(&statement.action)
    }

    async fn fetch_exists(&mut self, statement: &Statement) -> Result<bool> {
        self.server.exists(&statement.action)
    }

    async fn quote_literal(&mut self, value: &str) -> Result<String> {
        Ok(format!("'{}'", value.replace('\'', "''")))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.server.lock().closes += 1;
        Ok(())
    }
}

/// Connector that routes descriptors to simulated servers
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    servers: HashMap<String, MemoryServer>,
}

impl MemoryConnector {
    /// Create a connector with no reachable servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `server` reachable at the (normalized) descriptor
    #[must_use]
    pub fn with_server(mut self, descriptor: impl Into<String>, server: MemoryServer) -> Self {
        self.servers.insert(descriptor.into(), server);
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, _family: DialectFamily, descriptor: &str) -> Result<Box<dyn SqlSession>> {
        match self.servers.get(descriptor) {
            Some(server) => Ok(Box::new(server.session()?)),
            None => Err(Error::connect_attempt(format!(
                "no server listening for {descriptor}"
            ))),
        }
    }
}
