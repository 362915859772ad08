use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::HashedPassword).string().not_null())
                    .col(ColumnDef::new(Users::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Teams::Table)
                    .col(pk_id_col(manager, Teams::Id))
                    .col(ColumnDef::new(Teams::Name).string().not_null())
                    .col(ColumnDef::new(Teams::Slug).string().not_null())
                    .col(ColumnDef::new(Teams::Description).text())
                    .col(timestamp_col(Teams::CreatedAt))
                    .col(timestamp_col(Teams::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_slug")
                    .table(Teams::Table)
                    .col(Teams::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TeamMembers::Table)
                    .col(pk_id_col(manager, TeamMembers::Id))
                    .col(fk_id_col(manager, TeamMembers::TeamId))
                    .col(fk_id_col(manager, TeamMembers::UserId))
                    .col(timestamp_col(TeamMembers::JoinedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_team_id")
                            .from(TeamMembers::Table, TeamMembers::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_user_id")
                            .from(TeamMembers::Table, TeamMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_team_members_team_user")
                    .table(TeamMembers::Table)
                    .col(TeamMembers::TeamId)
                    .col(TeamMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Themes::Table)
                    .col(pk_id_col(manager, Themes::Id))
                    .col(ColumnDef::new(Themes::Title).string().not_null())
                    .col(ColumnDef::new(Themes::Description).text())
                    .col(ColumnDef::new(Themes::Status).string().not_null())
                    .col(timestamp_col(Themes::CreatedAt))
                    .col(timestamp_col(Themes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(ProjectTypes::Table)
                    .col(pk_id_col(manager, ProjectTypes::Id))
                    .col(ColumnDef::new(ProjectTypes::Name).string().not_null())
                    .col(ColumnDef::new(ProjectTypes::Slug).string().not_null())
                    .col(ColumnDef::new(ProjectTypes::Description).text())
                    .col(ColumnDef::new(ProjectTypes::Workflow).json().not_null())
                    .col(ColumnDef::new(ProjectTypes::Color).string())
                    .col(timestamp_col(ProjectTypes::CreatedAt))
                    .col(timestamp_col(ProjectTypes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_project_types_slug")
                    .table(ProjectTypes::Table)
                    .col(ProjectTypes::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(ProjectTypeFields::Table)
                    .col(pk_id_col(manager, ProjectTypeFields::Id))
                    .col(fk_id_col(manager, ProjectTypeFields::ProjectTypeId))
                    .col(ColumnDef::new(ProjectTypeFields::Key).string().not_null())
                    .col(ColumnDef::new(ProjectTypeFields::Label).string().not_null())
                    .col(ColumnDef::new(ProjectTypeFields::FieldType).string().not_null())
                    .col(ColumnDef::new(ProjectTypeFields::Options).json())
                    .col(
                        ColumnDef::new(ProjectTypeFields::Required)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ProjectTypeFields::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_type_fields_project_type_id")
                            .from(ProjectTypeFields::Table, ProjectTypeFields::ProjectTypeId)
                            .to(ProjectTypes::Table, ProjectTypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_project_type_fields_type_key")
                    .table(ProjectTypeFields::Table)
                    .col(ProjectTypeFields::ProjectTypeId)
                    .col(ProjectTypeFields::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(fk_id_nullable_col(manager, Projects::ThemeId))
                    .col(fk_id_col(manager, Projects::ProjectTypeId))
                    .col(ColumnDef::new(Projects::Title).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(ColumnDef::new(Projects::Status).string().not_null())
                    .col(ColumnDef::new(Projects::CustomData).json().not_null())
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_theme_id")
                            .from(Projects::Table, Projects::ThemeId)
                            .to(Themes::Table, Themes::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_project_type_id")
                            .from(Projects::Table, Projects::ProjectTypeId)
                            .to(ProjectTypes::Table, ProjectTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_project_type_id_status")
                    .table(Projects::Table)
                    .col(Projects::ProjectTypeId)
                    .col(Projects::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(ProjectDependencies::Table)
                    .col(fk_id_col(manager, ProjectDependencies::ProjectId))
                    .col(fk_id_col(manager, ProjectDependencies::DependsOnId))
                    .primary_key(
                        Index::create()
                            .col(ProjectDependencies::ProjectId)
                            .col(ProjectDependencies::DependsOnId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_dependencies_project_id")
                            .from(ProjectDependencies::Table, ProjectDependencies::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_dependencies_depends_on_id")
                            .from(ProjectDependencies::Table, ProjectDependencies::DependsOnId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskTypes::Table)
                    .col(pk_id_col(manager, TaskTypes::Id))
                    .col(fk_id_col(manager, TaskTypes::TeamId))
                    .col(ColumnDef::new(TaskTypes::Name).string().not_null())
                    .col(ColumnDef::new(TaskTypes::Slug).string().not_null())
                    .col(ColumnDef::new(TaskTypes::Description).text())
                    .col(ColumnDef::new(TaskTypes::Workflow).json().not_null())
                    .col(ColumnDef::new(TaskTypes::Color).string())
                    .col(timestamp_col(TaskTypes::CreatedAt))
                    .col(timestamp_col(TaskTypes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_types_team_id")
                            .from(TaskTypes::Table, TaskTypes::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_types_team_slug")
                    .table(TaskTypes::Table)
                    .col(TaskTypes::TeamId)
                    .col(TaskTypes::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskTypeFields::Table)
                    .col(pk_id_col(manager, TaskTypeFields::Id))
                    .col(fk_id_col(manager, TaskTypeFields::TaskTypeId))
                    .col(ColumnDef::new(TaskTypeFields::Key).string().not_null())
                    .col(ColumnDef::new(TaskTypeFields::Label).string().not_null())
                    .col(ColumnDef::new(TaskTypeFields::FieldType).string().not_null())
                    .col(ColumnDef::new(TaskTypeFields::Options).json())
                    .col(
                        ColumnDef::new(TaskTypeFields::Required)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(TaskTypeFields::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_type_fields_task_type_id")
                            .from(TaskTypeFields::Table, TaskTypeFields::TaskTypeId)
                            .to(TaskTypes::Table, TaskTypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_type_fields_type_key")
                    .table(TaskTypeFields::Table)
                    .col(TaskTypeFields::TaskTypeId)
                    .col(TaskTypeFields::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Releases::Table)
                    .col(pk_id_col(manager, Releases::Id))
                    .col(ColumnDef::new(Releases::Version).string().not_null())
                    .col(ColumnDef::new(Releases::Title).string().not_null())
                    .col(ColumnDef::new(Releases::Description).text())
                    .col(ColumnDef::new(Releases::TargetDate).date())
                    .col(ColumnDef::new(Releases::ReleaseDate).date())
                    .col(
                        ColumnDef::new(Releases::Status)
                            .string()
                            .not_null()
                            .default("planned"),
                    )
                    .col(timestamp_col(Releases::CreatedAt))
                    .col(timestamp_col(Releases::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_releases_version")
                    .table(Releases::Table)
                    .col(Releases::Version)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(ColumnDef::new(Tasks::DisplayId).string().not_null())
                    .col(fk_id_nullable_col(manager, Tasks::ProjectId))
                    .col(fk_id_col(manager, Tasks::TeamId))
                    .col(fk_id_col(manager, Tasks::TaskTypeId))
                    .col(fk_id_nullable_col(manager, Tasks::ReleaseId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(ColumnDef::new(Tasks::Status).string().not_null())
                    .col(ColumnDef::new(Tasks::Estimation).double())
                    .col(ColumnDef::new(Tasks::CustomData).json().not_null())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_team_id")
                            .from(Tasks::Table, Tasks::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_task_type_id")
                            .from(Tasks::Table, Tasks::TaskTypeId)
                            .to(TaskTypes::Table, TaskTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_release_id")
                            .from(Tasks::Table, Tasks::ReleaseId)
                            .to(Releases::Table, Releases::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_display_id")
                    .table(Tasks::Table)
                    .col(Tasks::DisplayId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_team_id")
                    .table(Tasks::Table)
                    .col(Tasks::TeamId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_task_type_id_status")
                    .table(Tasks::Table)
                    .col(Tasks::TaskTypeId)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskDependencies::Table)
                    .col(fk_id_col(manager, TaskDependencies::TaskId))
                    .col(fk_id_col(manager, TaskDependencies::DependsOnId))
                    .primary_key(
                        Index::create()
                            .col(TaskDependencies::TaskId)
                            .col(TaskDependencies::DependsOnId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_task_id")
                            .from(TaskDependencies::Table, TaskDependencies::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_dependencies_depends_on_id")
                            .from(TaskDependencies::Table, TaskDependencies::DependsOnId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(GithubLinks::Table)
                    .col(pk_id_col(manager, GithubLinks::Id))
                    .col(fk_id_col(manager, GithubLinks::TaskId))
                    .col(ColumnDef::new(GithubLinks::LinkType).string().not_null())
                    .col(ColumnDef::new(GithubLinks::RepositoryOwner).string().not_null())
                    .col(ColumnDef::new(GithubLinks::RepositoryName).string().not_null())
                    .col(ColumnDef::new(GithubLinks::PrNumber).big_integer())
                    .col(ColumnDef::new(GithubLinks::PrTitle).string())
                    .col(ColumnDef::new(GithubLinks::PrStatus).string())
                    .col(ColumnDef::new(GithubLinks::BranchName).string())
                    .col(ColumnDef::new(GithubLinks::CommitSha).string())
                    .col(ColumnDef::new(GithubLinks::Url).string().not_null())
                    .col(timestamp_col(GithubLinks::CreatedAt))
                    .col(timestamp_col(GithubLinks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_github_links_task_id")
                            .from(GithubLinks::Table, GithubLinks::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_github_links_task_id")
                    .table(GithubLinks::Table)
                    .col(GithubLinks::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GithubLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskDependencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Releases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskTypeFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectDependencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectTypeFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Themes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    fk_id_nullable_col(manager, col).not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    HashedPassword,
    FullName,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Teams {
    Table,
    Id,
    Name,
    Slug,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TeamMembers {
    Table,
    Id,
    TeamId,
    UserId,
    JoinedAt,
}

#[derive(Iden)]
enum Themes {
    Table,
    Id,
    Title,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectTypes {
    Table,
    Id,
    Name,
    Slug,
    Description,
    Workflow,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectTypeFields {
    Table,
    Id,
    ProjectTypeId,
    Key,
    Label,
    FieldType,
    Options,
    Required,
    Order,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    ThemeId,
    ProjectTypeId,
    Title,
    Description,
    Status,
    CustomData,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectDependencies {
    Table,
    ProjectId,
    DependsOnId,
}

#[derive(Iden)]
enum TaskTypes {
    Table,
    Id,
    TeamId,
    Name,
    Slug,
    Description,
    Workflow,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskTypeFields {
    Table,
    Id,
    TaskTypeId,
    Key,
    Label,
    FieldType,
    Options,
    Required,
    Order,
}

#[derive(Iden)]
enum Releases {
    Table,
    Id,
    Version,
    Title,
    Description,
    TargetDate,
    ReleaseDate,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    DisplayId,
    ProjectId,
    TeamId,
    TaskTypeId,
    ReleaseId,
    Title,
    Description,
    Status,
    Estimation,
    CustomData,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskDependencies {
    Table,
    TaskId,
    DependsOnId,
}

#[derive(Iden)]
enum GithubLinks {
    Table,
    Id,
    TaskId,
    LinkType,
    RepositoryOwner,
    RepositoryName,
    PrNumber,
    PrTitle,
    PrStatus,
    BranchName,
    CommitSha,
    Url,
    CreatedAt,
    UpdatedAt,
}
