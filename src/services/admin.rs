use crate::{
    error::{AppError, AppResult},
    models::{notice, question, user, Campus, Course, Notice, Question, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_stats(&self) -> AppResult<AdminStats> {
        let now = chrono::Utc::now().naive_utc();
        let today_start = now.date().and_time(chrono::NaiveTime::MIN);

        let total_users = User::find().count(&self.db).await?;
        let total_questions = Question::find().count(&self.db).await?;
        let pending_questions = Question::find()
            .filter(question::Column::IsApproved.eq(false))
            .count(&self.db)
            .await?;
        let total_campuses = Campus::find().count(&self.db).await?;
        let total_courses = Course::find().count(&self.db).await?;
        let active_notices = Notice::find()
            .filter(notice::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(notice::Column::ExpiresAt.is_null())
                    .add(notice::Column::ExpiresAt.gt(now)),
            )
            .count(&self.db)
            .await?;
        let questions_today = Question::find()
            .filter(question::Column::CreatedAt.gte(today_start))
            .count(&self.db)
            .await?;

        Ok(AdminStats {
            total_users,
            total_questions,
            pending_questions,
            total_campuses,
            total_courses,
            active_notices,
            questions_today,
        })
    }

    pub async fn list_users(&self, page: u64, per_page: u64) -> AppResult<(Vec<UserModel>, u64)> {
        let paginator = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    pub async fn set_pro(&self, user_id: i32, is_pro: bool) -> AppResult<UserModel> {
        let existing = self.find_user(user_id).await?;

        let mut active: user::ActiveModel = existing.into();
        active.is_pro = Set(is_pro);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    /// Grant or revoke admin rights. `acting_user_id` may not demote itself.
    pub async fn set_admin(
        &self,
        acting_user_id: i32,
        user_id: i32,
        is_admin: bool,
    ) -> AppResult<UserModel> {
        if acting_user_id == user_id && !is_admin {
            return Err(AppError::Validation(
                "You cannot revoke your own admin access".to_string(),
            ));
        }

        let existing = self.find_user(user_id).await?;

        let mut active: user::ActiveModel = existing.into();
        active.is_admin = Set(is_admin);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;

        tracing::info!(
            acting_user_id,
            user_id,
            is_admin,
            "Admin flag changed"
        );
        Ok(updated)
    }

    async fn find_user(&self, user_id: i32) -> AppResult<UserModel> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("User"))
    }
}

pub struct AdminStats {
    pub total_users: u64,
    pub total_questions: u64,
    pub pending_questions: u64,
    pub total_campuses: u64,
    pub total_courses: u64,
    pub active_notices: u64,
    pub questions_today: u64,
}
