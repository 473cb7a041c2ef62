use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Names are unique per campus semester regardless of case.
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_campus_semester_name
             ON questions (campus_id, semester, LOWER(question_name))",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DROP INDEX IF EXISTS idx_questions_campus_semester_name")
            .await?;

        Ok(())
    }
}
