//! Idempotent bootstrap data: admin account, default teams and types, a sample theme.

use db::{
    DbErr, DbPool,
    models::{
        project_type::{CreateProjectType, ProjectType},
        task_type::{CreateTaskType, TaskType},
        team::{CreateTeam, Team},
        theme::{CreateTheme, Theme},
        user::User,
    },
    types::UserRole,
};
use sea_orm::TransactionTrait;
use thiserror::Error;

use super::password::{PasswordHashError, hash_password};

pub const ADMIN_EMAIL: &str = "admin@corepm.local";
pub const ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Password(#[from] PasswordHashError),
}

struct TypeSeed {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    workflow: &'static [&'static str],
    color: &'static str,
}

const TEAMS: [(&str, &str, &str); 3] = [
    ("Platform", "platform", "Platform engineering team"),
    ("Frontend", "frontend", "Frontend development team"),
    ("Backend", "backend", "Backend development team"),
];

const PROJECT_TYPES: [TypeSeed; 3] = [
    TypeSeed {
        name: "Initiative",
        slug: "initiative",
        description: "Large cross-team initiatives",
        workflow: &["Discovery", "Planning", "In Progress", "Review", "Done"],
        color: "#6366f1",
    },
    TypeSeed {
        name: "Epic",
        slug: "epic",
        description: "Medium-sized feature work",
        workflow: &["Backlog", "Ready", "In Progress", "Review", "Done"],
        color: "#8b5cf6",
    },
    TypeSeed {
        name: "Tech Debt",
        slug: "tech-debt",
        description: "Technical debt reduction projects",
        workflow: &["Identified", "Prioritized", "In Progress", "Resolved"],
        color: "#f59e0b",
    },
];

const TASK_TYPES: [TypeSeed; 4] = [
    TypeSeed {
        name: "Feature",
        slug: "feature",
        description: "New feature development",
        workflow: &["Backlog", "Ready", "In Progress", "In Review", "Done"],
        color: "#10b981",
    },
    TypeSeed {
        name: "Bug",
        slug: "bug",
        description: "Bug fixes",
        workflow: &["Reported", "Triaged", "In Progress", "In Review", "Fixed"],
        color: "#ef4444",
    },
    TypeSeed {
        name: "Tech Debt",
        slug: "debt",
        description: "Technical debt items",
        workflow: &["Backlog", "In Progress", "Done"],
        color: "#f59e0b",
    },
    TypeSeed {
        name: "Discovery",
        slug: "discovery",
        description: "Research and discovery work",
        workflow: &["To Do", "In Progress", "Done"],
        color: "#3b82f6",
    },
];

const SAMPLE_THEME: (&str, &str) = ("Q1 2024 Objectives", "Strategic objectives for Q1 2024");

impl TypeSeed {
    fn workflow(&self) -> Vec<String> {
        self.workflow.iter().map(|status| status.to_string()).collect()
    }
}

/// Rows inserted by one seeding run; zero everywhere on a re-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub teams: usize,
    pub project_types: usize,
    pub task_types: usize,
    pub theme_created: bool,
}

pub async fn seed_database(pool: &DbPool, default_theme_status: &str) -> Result<SeedReport, SeedError> {
    let tx = pool.begin().await?;
    let mut report = SeedReport::default();

    if User::find_credentials(&tx, ADMIN_EMAIL).await?.is_none() {
        let hash = hash_password(ADMIN_PASSWORD)?;
        User::create(&tx, ADMIN_EMAIL, "Admin User", hash, UserRole::Admin).await?;
        tracing::info!(email = ADMIN_EMAIL, "Created admin user");
        report.admin_created = true;
    }

    for (name, slug, description) in TEAMS {
        if Team::find_by_slug(&tx, slug).await?.is_some() {
            continue;
        }
        Team::create(
            &tx,
            &CreateTeam {
                name: name.to_string(),
                slug: slug.to_string(),
                description: Some(description.to_string()),
            },
        )
        .await?;
        tracing::info!(slug, "Created team");
        report.teams += 1;
    }

    for seed in &PROJECT_TYPES {
        if ProjectType::slug_exists(&tx, seed.slug).await? {
            continue;
        }
        ProjectType::create(
            &tx,
            &CreateProjectType {
                name: seed.name.to_string(),
                slug: seed.slug.to_string(),
                description: Some(seed.description.to_string()),
                workflow: seed.workflow(),
                color: Some(seed.color.to_string()),
                fields: Vec::new(),
            },
        )
        .await?;
        report.project_types += 1;
    }

    for (_, team_slug, _) in TEAMS {
        let Some(team) = Team::find_by_slug(&tx, team_slug).await? else {
            continue;
        };
        for seed in &TASK_TYPES {
            if TaskType::slug_exists(&tx, team.id, seed.slug).await? {
                continue;
            }
            TaskType::create(
                &tx,
                team.id,
                &CreateTaskType {
                    name: seed.name.to_string(),
                    slug: seed.slug.to_string(),
                    description: Some(seed.description.to_string()),
                    workflow: seed.workflow(),
                    color: Some(seed.color.to_string()),
                    fields: Vec::new(),
                },
            )
            .await?;
            report.task_types += 1;
        }
    }

    let (title, description) = SAMPLE_THEME;
    if Theme::find_by_title(&tx, title).await?.is_none() {
        Theme::create(
            &tx,
            &CreateTheme {
                title: title.to_string(),
                description: Some(description.to_string()),
                status: None,
            },
            default_theme_status,
        )
        .await?;
        report.theme_created = true;
    }

    tx.commit().await?;
    tracing::info!(?report, "Database seeded");
    Ok(report)
}
