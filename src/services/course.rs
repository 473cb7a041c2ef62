use crate::{
    error::{AppError, AppResult},
    models::{course, question, Course, CourseModel, Question, QuestionModel},
};
use sea_orm::sea_query::{Expr, NullOrdering};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

pub struct CourseWithCount {
    pub course: CourseModel,
    pub question_count: u64,
}

pub struct CourseChanges {
    pub name: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    /// `None` keeps the current flag.
    pub is_active: Option<bool>,
}

pub struct CourseService {
    db: DatabaseConnection,
}

impl CourseService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest academic year first, courses without a year last, then by name.
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<CourseWithCount>> {
        let mut query = Course::find();
        if !include_inactive {
            query = query.filter(course::Column::IsActive.eq(true));
        }
        let courses = query
            .order_by_with_nulls(course::Column::Year, Order::Desc, NullOrdering::Last)
            .order_by_asc(course::Column::Name)
            .all(&self.db)
            .await?;

        let rows: Vec<(Option<i32>, i64)> = Question::find()
            .select_only()
            .column(question::Column::CourseId)
            .column_as(Expr::col(question::Column::Id).count(), "question_count")
            .filter(question::Column::CourseId.is_not_null())
            .group_by(question::Column::CourseId)
            .into_tuple()
            .all(&self.db)
            .await?;
        let counts: HashMap<i32, u64> = rows
            .into_iter()
            .filter_map(|(id, count)| id.map(|id| (id, count.max(0) as u64)))
            .collect();

        Ok(courses
            .into_iter()
            .map(|course| CourseWithCount {
                question_count: counts.get(&course.id).copied().unwrap_or(0),
                course,
            })
            .collect())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CourseModel> {
        Course::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("Course"))
    }

    pub async fn get_with_questions(&self, id: i32) -> AppResult<(CourseModel, Vec<QuestionModel>)> {
        let course = self.get_by_id(id).await?;
        let questions = Question::find()
            .filter(question::Column::CourseId.eq(course.id))
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .all(&self.db)
            .await?;
        Ok((course, questions))
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        year: Option<i32>,
    ) -> AppResult<CourseModel> {
        self.ensure_name_free(name, None).await?;

        let now = chrono::Utc::now().naive_utc();
        let new_course = course::ActiveModel {
            name: Set(name.trim().to_string()),
            description: Set(description),
            year: Set(year),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(new_course.insert(&self.db).await?)
    }

    pub async fn update(&self, id: i32, changes: CourseChanges) -> AppResult<CourseModel> {
        let existing = self.get_by_id(id).await?;
        self.ensure_name_free(&changes.name, Some(existing.id))
            .await?;

        let is_active = changes.is_active.unwrap_or(existing.is_active);
        let mut active: course::ActiveModel = existing.into();
        active.name = Set(changes.name.trim().to_string());
        active.description = Set(changes.description);
        active.year = Set(changes.year);
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;

        let referenced = Question::find()
            .filter(question::Column::CourseId.eq(existing.id))
            .count(&self.db)
            .await?;
        if referenced > 0 {
            return Err(AppError::Validation(
                "Cannot delete a course that still has questions".to_string(),
            ));
        }

        Course::delete_by_id(existing.id).exec(&self.db).await?;
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> AppResult<()> {
        let mut query = Course::find().filter(course::Column::Name.eq(name.trim()));
        if let Some(id) = except {
            query = query.filter(course::Column::Id.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(AppError::Conflict("Course name already exists".to_string()));
        }
        Ok(())
    }
}
