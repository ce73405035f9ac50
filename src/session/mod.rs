//! Post-authentication session migration.
//!
//! After a successful sign-in or sign-up, [`SessionMigrationManager`] decides
//! where the user lands:
//!
//! 1. Pending anonymous work with at least one message becomes a new project
//!    named "Design from HH:MM:SS", the buffer is cleared, and the user is
//!    sent to it. Existing projects are not consulted.
//! 2. Otherwise the most recent existing project is opened.
//! 3. With no projects at all, an empty "New Design #n" project is created.
//!
//! A failed authentication runs none of this. Once migration starts, store
//! failures propagate; there is no fallback.

pub mod anon;

pub use anon::{AnonWorkStore, SessionAnonStore};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CreatedProject, NewProject, ProjectSummary};
use crate::{Error, Result};

/// Result of a sign-in or sign-up attempt, returned to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Credential verification.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResult>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResult>;
}

/// Durable projects of the authenticated identity.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Projects ordered most recent first.
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>>;

    async fn create_project(&self, project: NewProject) -> Result<CreatedProject>;
}

/// Navigation target for the migration outcome.
pub trait Router: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Where a migration sent the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Anonymous work was saved as a new project
    Migrated { project_id: String },
    /// The most recent existing project was opened
    Resumed { project_id: String },
    /// An empty project was created
    Created { project_id: String },
}

impl MigrationOutcome {
    pub fn project_id(&self) -> &str {
        match self {
            MigrationOutcome::Migrated { project_id }
            | MigrationOutcome::Resumed { project_id }
            | MigrationOutcome::Created { project_id } => project_id,
        }
    }
}

/// Holds the loading flag for the duration of one run.
///
/// Dropping the guard clears the flag, whichever way the run ends.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(Error::MigrationInProgress);
        }
        Ok(Self { flag })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy)]
enum AuthMode {
    SignIn,
    SignUp,
}

/// Runs authentication followed by migration.
///
/// Sign-in, sign-up and a standalone [`migrate`](Self::migrate) share one
/// loading flag, so at most one of them runs at a time.
pub struct SessionMigrationManager {
    auth: Option<Arc<dyn Authenticator>>,
    projects: Arc<dyn ProjectStore>,
    anon: Arc<dyn AnonWorkStore>,
    router: Arc<dyn Router>,
    loading: AtomicBool,
}

impl SessionMigrationManager {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        projects: Arc<dyn ProjectStore>,
        anon: Arc<dyn AnonWorkStore>,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            auth: Some(auth),
            projects,
            anon,
            router,
            loading: AtomicBool::new(false),
        }
    }

    /// A manager for hosts that authenticate on their own and only need the
    /// landing decision. Sign-in and sign-up fail with `NoAuthenticator`.
    pub fn migration_only(
        projects: Arc<dyn ProjectStore>,
        anon: Arc<dyn AnonWorkStore>,
        router: Arc<dyn Router>,
    ) -> Self {
        Self {
            auth: None,
            projects,
            anon,
            router,
            loading: AtomicBool::new(false),
        }
    }

    /// Whether a sign-in, sign-up or migration is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResult> {
        self.authenticate(AuthMode::SignIn, email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResult> {
        self.authenticate(AuthMode::SignUp, email, password).await
    }

    async fn authenticate(
        &self,
        mode: AuthMode,
        email: &str,
        password: &str,
    ) -> Result<AuthResult> {
        let auth = self.auth.as_ref().ok_or(Error::NoAuthenticator)?;
        let _loading = LoadingGuard::acquire(&self.loading)?;

        let result = match mode {
            AuthMode::SignIn => auth.sign_in(email, password).await?,
            AuthMode::SignUp => auth.sign_up(email, password).await?,
        };
        if !result.success {
            tracing::info!(?mode, "authentication rejected");
            return Ok(result);
        }

        let outcome = self.run_migration().await?;
        tracing::info!(?mode, ?outcome, "session migrated");
        Ok(result)
    }

    /// Decide the landing project for an already authenticated identity and
    /// navigate to it.
    ///
    /// Fails with `MigrationInProgress` while a sign-in, sign-up or another
    /// migration is running.
    pub async fn migrate(&self) -> Result<MigrationOutcome> {
        let _loading = LoadingGuard::acquire(&self.loading)?;
        let outcome = self.run_migration().await?;
        tracing::info!(?outcome, "session migrated");
        Ok(outcome)
    }

    async fn run_migration(&self) -> Result<MigrationOutcome> {
        let pending = self.anon.get().filter(|buffer| !buffer.messages.is_empty());

        if let Some(buffer) = pending {
            let name = format!("Design from {}", chrono::Local::now().format("%H:%M:%S"));
            let created = self
                .projects
                .create_project(NewProject {
                    name,
                    messages: buffer.messages,
                    data: buffer.file_system_data,
                })
                .await
                .map_err(migration_error)?;
            self.anon.clear();
            self.router.navigate(&format!("/{}", created.id));
            return Ok(MigrationOutcome::Migrated {
                project_id: created.id,
            });
        }

        let projects = self.projects.list_projects().await.map_err(migration_error)?;
        if let Some(latest) = projects.into_iter().next() {
            self.router.navigate(&format!("/{}", latest.id));
            return Ok(MigrationOutcome::Resumed {
                project_id: latest.id,
            });
        }

        let created = self
            .projects
            .create_project(NewProject {
                name: format!("New Design #{}", design_number()),
                ..Default::default()
            })
            .await
            .map_err(migration_error)?;
        self.router.navigate(&format!("/{}", created.id));
        Ok(MigrationOutcome::Created {
            project_id: created.id,
        })
    }
}

fn migration_error(e: Error) -> Error {
    match e {
        Error::Migration(_) => e,
        other => Error::Migration(other.to_string()),
    }
}

/// Number for an untitled design, in `0..100000`.
fn design_number() -> u32 {
    (uuid::Uuid::new_v4().as_u128() % 100_000) as u32
}
