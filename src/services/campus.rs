use crate::{
    error::{AppError, AppResult},
    models::{campus, question, Campus, CampusModel, Question},
    services::cache::CacheService,
    services::question::{MAX_SEMESTER, MIN_SEMESTER},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CACHE_KEY_CAMPUSES_LIST: &str = "campuses:list";
const CACHE_TTL_CAMPUSES: u64 = 300; // 5 minutes

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampusWithCount {
    pub campus: CampusModel,
    pub question_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemesterStat {
    pub semester: i32,
    pub question_count: u64,
}

pub struct CampusChanges {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// `None` keeps the current flag.
    pub is_active: Option<bool>,
}

pub struct CampusService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl CampusService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Active campuses by name with their approved question counts.
    pub async fn list(&self) -> AppResult<Vec<CampusWithCount>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache
                .get::<Vec<CampusWithCount>>(CACHE_KEY_CAMPUSES_LIST)
                .await
            {
                return Ok(cached);
            }
        }

        let campuses = Campus::find()
            .filter(campus::Column::IsActive.eq(true))
            .order_by_asc(campus::Column::Name)
            .all(&self.db)
            .await?;

        let counts = self.approved_counts_by_campus().await?;
        let list: Vec<CampusWithCount> = campuses
            .into_iter()
            .map(|campus| CampusWithCount {
                question_count: counts.get(&campus.id).copied().unwrap_or(0),
                campus,
            })
            .collect();

        if let Some(cache) = &self.cache {
            cache
                .set(CACHE_KEY_CAMPUSES_LIST, &list, CACHE_TTL_CAMPUSES)
                .await;
        }

        Ok(list)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<CampusModel> {
        Campus::find()
            .filter(campus::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("Campus"))
    }

    pub async fn get_with_count(&self, slug: &str) -> AppResult<CampusWithCount> {
        let campus = self.get_by_slug(slug).await?;
        let question_count = Question::find()
            .filter(question::Column::CampusId.eq(campus.id))
            .filter(question::Column::IsApproved.eq(true))
            .count(&self.db)
            .await?;

        Ok(CampusWithCount {
            campus,
            question_count,
        })
    }

    /// Approved question counts for semesters 1..=8 of a campus.
    pub async fn semester_stats(&self, slug: &str) -> AppResult<(CampusModel, Vec<SemesterStat>)> {
        let campus = self.get_by_slug(slug).await?;

        let rows: Vec<(i32, i64)> = Question::find()
            .select_only()
            .column(question::Column::Semester)
            .column_as(Expr::col(question::Column::Id).count(), "question_count")
            .filter(question::Column::CampusId.eq(campus.id))
            .filter(question::Column::IsApproved.eq(true))
            .group_by(question::Column::Semester)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok((campus, fill_semester_stats(&rows)))
    }

    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
        image_url: Option<String>,
    ) -> AppResult<CampusModel> {
        let taken = Campus::find()
            .filter(
                Condition::any()
                    .add(campus::Column::Name.eq(name))
                    .add(campus::Column::Slug.eq(slug)),
            )
            .one(&self.db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(
                "Campus name or slug already exists".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let new_campus = campus::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(description),
            image_url: Set(image_url),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let campus = new_campus.insert(&self.db).await?;
        self.invalidate_list_cache().await;
        Ok(campus)
    }

    pub async fn update(&self, slug: &str, changes: CampusChanges) -> AppResult<CampusModel> {
        let existing = self.get_by_slug(slug).await?;

        let clash = Campus::find()
            .filter(campus::Column::Name.eq(changes.name.as_str()))
            .filter(campus::Column::Id.ne(existing.id))
            .one(&self.db)
            .await?;
        if clash.is_some() {
            return Err(AppError::Conflict("Campus name already exists".to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        let is_active = changes.is_active.unwrap_or(existing.is_active);
        let mut active: campus::ActiveModel = existing.into();
        active.name = Set(changes.name);
        active.description = Set(changes.description);
        active.image_url = Set(changes.image_url);
        active.is_active = Set(is_active);
        active.updated_at = Set(now);

        let updated = active.update(&self.db).await?;
        self.invalidate_list_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, slug: &str) -> AppResult<()> {
        let existing = self.get_by_slug(slug).await?;

        let questions = Question::find()
            .filter(question::Column::CampusId.eq(existing.id))
            .count(&self.db)
            .await?;
        if questions > 0 {
            return Err(AppError::Validation(
                "Cannot delete a campus that still has questions".to_string(),
            ));
        }

        Campus::delete_by_id(existing.id).exec(&self.db).await?;
        self.invalidate_list_cache().await;
        Ok(())
    }

    pub async fn invalidate_list_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(CACHE_KEY_CAMPUSES_LIST).await;
        }
    }

    async fn approved_counts_by_campus(&self) -> AppResult<HashMap<i32, u64>> {
        let rows: Vec<(Option<i32>, i64)> = Question::find()
            .select_only()
            .column(question::Column::CampusId)
            .column_as(Expr::col(question::Column::Id).count(), "question_count")
            .filter(question::Column::IsApproved.eq(true))
            .group_by(question::Column::CampusId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(campus_id, count)| campus_id.map(|id| (id, count.max(0) as u64)))
            .collect())
    }
}

/// One entry per semester, zero where the query returned no row.
fn fill_semester_stats(rows: &[(i32, i64)]) -> Vec<SemesterStat> {
    (MIN_SEMESTER..=MAX_SEMESTER)
        .map(|semester| SemesterStat {
            semester,
            question_count: rows
                .iter()
                .find(|(s, _)| *s == semester)
                .map(|(_, count)| (*count).max(0) as u64)
                .unwrap_or(0),
        })
        .collect()
}
