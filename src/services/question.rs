use crate::{
    error::{AppError, AppResult},
    models::{course, question, Course, Question, QuestionModel},
    services::contribution::ContributionService,
    utils::text::contains_pattern,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::BTreeSet;

pub const MIN_SEMESTER: i32 = 1;
pub const MAX_SEMESTER: i32 = 8;
/// Semester assumed when an admin omits it.
pub const DEFAULT_SEMESTER: i32 = 4;

pub const DUPLICATE_NAME: &str =
    "A question with this name already exists for this campus and semester";

pub fn is_valid_semester(semester: i32) -> bool {
    (MIN_SEMESTER..=MAX_SEMESTER).contains(&semester)
}

pub fn ensure_valid_semester(semester: i32) -> AppResult<()> {
    if is_valid_semester(semester) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Semester must be between {} and {}",
            MIN_SEMESTER, MAX_SEMESTER
        )))
    }
}

/// Catalogue filters; every field narrows the result when present.
#[derive(Debug, Default, Clone)]
pub struct QuestionFilter {
    pub campus_id: Option<i32>,
    pub semester: Option<i32>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub search: Option<String>,
    pub course_id: Option<i32>,
}

impl QuestionFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all().add(question::Column::IsApproved.eq(true));

        if let Some(campus_id) = self.campus_id {
            cond = cond.add(question::Column::CampusId.eq(campus_id));
        }
        if let Some(semester) = self.semester {
            cond = cond.add(question::Column::Semester.eq(semester));
        }
        if let Some(subject) = non_empty(&self.subject) {
            cond = cond.add(question::Column::Subject.eq(subject));
        }
        if let Some(topic) = non_empty(&self.topic) {
            cond = cond.add(question::Column::Topic.eq(topic));
        }
        if let Some(course_id) = self.course_id {
            cond = cond.add(question::Column::CourseId.eq(course_id));
        }
        if let Some(search) = non_empty(&self.search) {
            let pattern = contains_pattern(search);
            cond = cond.add(
                Condition::any()
                    .add(lower(question::Column::QuestionName).like(pattern.as_str()))
                    .add(lower(question::Column::Topic).like(pattern.as_str()))
                    .add(lower(question::Column::Subject).like(pattern.as_str())),
            );
        }

        cond
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn lower(column: question::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col(column)))
}

/// Fields shared by admin create and update.
#[derive(Debug, Clone)]
pub struct QuestionInput {
    pub question_name: String,
    pub subject: String,
    pub topic: String,
    pub link: String,
    pub semester: i32,
    pub year: Option<i32>,
    pub campus_id: Option<i32>,
    pub course_id: Option<i32>,
}

pub struct QuestionService {
    db: DatabaseConnection,
}

impl QuestionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Approved questions matching `filter`, newest first.
    pub async fn list(&self, filter: &QuestionFilter) -> AppResult<Vec<QuestionModel>> {
        let questions = Question::find()
            .filter(filter.condition())
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .all(&self.db)
            .await?;
        Ok(questions)
    }

    /// Distinct subjects and topics among approved questions in scope.
    pub async fn filters(&self, filter: &QuestionFilter) -> AppResult<(Vec<String>, Vec<String>)> {
        let pairs: Vec<(String, String)> = Question::find()
            .select_only()
            .column(question::Column::Subject)
            .column(question::Column::Topic)
            .filter(filter.condition())
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(collect_filters(pairs))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<QuestionModel> {
        Question::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("Question"))
    }

    /// Whether `name` (case-insensitive) already exists in a campus semester.
    pub async fn name_taken(&self, campus_id: i32, semester: i32, name: &str) -> AppResult<bool> {
        let existing = Question::find()
            .filter(question::Column::CampusId.eq(campus_id))
            .filter(question::Column::Semester.eq(semester))
            .filter(lower(question::Column::QuestionName).eq(name.trim().to_lowercase()))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn create(&self, input: QuestionInput) -> AppResult<QuestionModel> {
        ensure_valid_semester(input.semester)?;
        self.ensure_course_exists(input.course_id).await?;

        let now = chrono::Utc::now().naive_utc();
        let new_question = question::ActiveModel {
            question_name: Set(input.question_name.trim().to_string()),
            subject: Set(input.subject.trim().to_string()),
            topic: Set(input.topic.trim().to_string()),
            link: Set(input.link.trim().to_string()),
            semester: Set(input.semester),
            year: Set(input.year),
            is_approved: Set(true),
            campus_id: Set(input.campus_id),
            course_id: Set(input.course_id),
            contributor_email: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        new_question
            .insert(&self.db)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_NAME))
    }

    pub async fn update(&self, id: i32, input: QuestionInput) -> AppResult<QuestionModel> {
        ensure_valid_semester(input.semester)?;
        let existing = self.get_by_id(id).await?;
        self.ensure_course_exists(input.course_id).await?;

        let now = chrono::Utc::now().naive_utc();
        let mut active: question::ActiveModel = existing.into();
        active.question_name = Set(input.question_name.trim().to_string());
        active.subject = Set(input.subject.trim().to_string());
        active.topic = Set(input.topic.trim().to_string());
        active.link = Set(input.link.trim().to_string());
        active.semester = Set(input.semester);
        active.year = Set(input.year);
        active.campus_id = Set(input.campus_id);
        active.course_id = Set(input.course_id);
        active.updated_at = Set(now);

        active
            .update(&self.db)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_NAME))
    }

    pub async fn set_approval(&self, id: i32, is_approved: bool) -> AppResult<QuestionModel> {
        let existing = self.get_by_id(id).await?;
        let now = chrono::Utc::now().naive_utc();

        let mut active: question::ActiveModel = existing.into();
        active.is_approved = Set(is_approved);
        active.updated_at = Set(now);

        Ok(active.update(&self.db).await?)
    }

    /// Delete a question. Contributed questions take their points back
    /// from the contributor in the same transaction.
    pub async fn delete(&self, id: i32) -> AppResult<QuestionModel> {
        let existing = self.get_by_id(id).await?;

        let txn = self.db.begin().await?;
        Question::delete_by_id(existing.id).exec(&txn).await?;
        if let Some(email) = &existing.contributor_email {
            ContributionService::revoke(&txn, email).await?;
        }
        txn.commit().await?;

        Ok(existing)
    }

    /// Paginated admin view, unapproved questions included.
    pub async fn list_for_admin(
        &self,
        approved: Option<bool>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<QuestionModel>, u64)> {
        let mut query = Question::find();
        if let Some(approved) = approved {
            query = query.filter(question::Column::IsApproved.eq(approved));
        }

        let paginator = query
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let questions = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((questions, total))
    }

    async fn ensure_course_exists(&self, course_id: Option<i32>) -> AppResult<()> {
        if let Some(course_id) = course_id {
            Course::find()
                .filter(course::Column::Id.eq(course_id))
                .one(&self.db)
                .await?
                .ok_or(AppError::NotFoundResource("Course"))?;
        }
        Ok(())
    }
}

fn collect_filters(pairs: Vec<(String, String)>) -> (Vec<String>, Vec<String>) {
    let mut subjects = BTreeSet::new();
    let mut topics = BTreeSet::new();
    for (subject, topic) in pairs {
        subjects.insert(subject);
        topics.insert(topic);
    }
    (subjects.into_iter().collect(), topics.into_iter().collect())
}
