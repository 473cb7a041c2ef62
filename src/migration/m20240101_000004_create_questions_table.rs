use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Questions {
    Table,
    Id,
    QuestionName,
    Subject,
    Topic,
    Link,
    Semester,
    Year,
    IsApproved,
    CampusId,
    CourseId,
    ContributorEmail,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Campuses {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Email,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Questions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Questions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Questions::QuestionName)
                            .string_len(300)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Questions::Subject).string_len(100).not_null())
                    .col(ColumnDef::new(Questions::Topic).string_len(100).not_null())
                    .col(ColumnDef::new(Questions::Link).string_len(1000).not_null())
                    .col(
                        ColumnDef::new(Questions::Semester)
                            .integer()
                            .not_null()
                            .check(Expr::col(Questions::Semester).between(1, 8)),
                    )
                    .col(ColumnDef::new(Questions::Year).integer().null())
                    .col(
                        ColumnDef::new(Questions::IsApproved)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Questions::CampusId).integer().null())
                    .col(ColumnDef::new(Questions::CourseId).integer().null())
                    .col(
                        ColumnDef::new(Questions::ContributorEmail)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Questions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Questions::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_questions_campus_id")
                            .from(Questions::Table, Questions::CampusId)
                            .to(Campuses::Table, Campuses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_questions_course_id")
                            .from(Questions::Table, Questions::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_questions_contributor_email")
                            .from(Questions::Table, Questions::ContributorEmail)
                            .to(Users::Table, Users::Email)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_questions_campus_semester")
                    .table(Questions::Table)
                    .col(Questions::CampusId)
                    .col(Questions::Semester)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_questions_contributor_email")
                    .table(Questions::Table)
                    .col(Questions::ContributorEmail)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Questions::Table).to_owned())
            .await
    }
}
