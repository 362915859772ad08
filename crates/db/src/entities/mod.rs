pub mod github_link;
pub mod project;
pub mod project_dependency;
pub mod project_type;
pub mod project_type_field;
pub mod release;
pub mod task;
pub mod task_dependency;
pub mod task_type;
pub mod task_type_field;
pub mod team;
pub mod team_member;
pub mod theme;
pub mod user;
