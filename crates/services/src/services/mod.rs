pub mod board;
pub mod custom_fields;
pub mod github;
pub mod migration_plan;
pub mod password;
pub mod seed;
pub mod team;
pub mod type_migration;
pub mod type_schema;
pub mod validation;
pub mod workflow;
