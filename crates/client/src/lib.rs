//! Typed client for the Core PM API.

pub mod api;
mod board;
pub mod cache;
pub mod error;
pub mod fields;
mod migration;
pub mod session;
pub mod workflow;

pub use api::{ApiClient, ProjectListFilter, TaskListFilter};
pub use cache::{Mutation, QueryCache, QueryKey, QueryParams, Resource, invalidation_targets};
pub use error::{ClientError, SessionError};
pub use fields::{CustomFieldForm, FieldInput};
pub use session::{ColorTheme, Preferences, SessionStore};
pub use workflow::WorkflowSelector;
