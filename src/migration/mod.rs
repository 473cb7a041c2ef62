use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users_table;
mod m20240101_000002_create_campuses_table;
mod m20240101_000003_create_courses_table;
mod m20240101_000004_create_questions_table;
mod m20240101_000005_create_notices_table;
mod m20240101_000006_create_admins_table;
mod m20240101_000007_seed_campuses;
mod m20240101_000008_unique_question_names;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_campuses_table::Migration),
            Box::new(m20240101_000003_create_courses_table::Migration),
            Box::new(m20240101_000004_create_questions_table::Migration),
            Box::new(m20240101_000005_create_notices_table::Migration),
            Box::new(m20240101_000006_create_admins_table::Migration),
            Box::new(m20240101_000007_seed_campuses::Migration),
            Box::new(m20240101_000008_unique_question_names::Migration),
        ]
    }
}
