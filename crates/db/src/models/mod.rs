#![allow(clippy::useless_conversion)]

pub mod dependency;
pub mod github_link;
pub mod project;
pub mod project_type;
pub mod release;
pub mod task;
pub mod task_type;
pub mod team;
pub mod theme;
pub mod type_field;
pub mod user;
