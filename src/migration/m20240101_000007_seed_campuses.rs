use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "INSERT INTO campuses (name, slug, description, image_url, is_active) VALUES
             ('Delhi NCR', 'delhi-ncr', 'Newton School of Technology - Delhi NCR Campus', '/nst-delhi.png', TRUE),
             ('Pune', 'pune', 'Newton School of Technology - Pune Campus', '/nst-pune.png', TRUE),
             ('Bangalore', 'bangalore', 'Newton School of Technology - Bangalore Campus', '/nst-bangalore.png', TRUE)
             ON CONFLICT (slug) DO NOTHING",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "DELETE FROM campuses WHERE slug IN ('delhi-ncr', 'pune', 'bangalore')
             AND NOT EXISTS (SELECT 1 FROM questions WHERE questions.campus_id = campuses.id)",
        )
        .await?;

        Ok(())
    }
}
