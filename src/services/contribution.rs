use crate::{
    error::{AppError, AppResult},
    models::{campus, question, user, Campus, CampusModel, Question, QuestionModel, User, UserModel},
    services::question::{ensure_valid_semester, QuestionService, DUPLICATE_NAME},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

pub const POINTS_PER_CONTRIBUTION: i32 = 10;
pub const DEFAULT_LEADERBOARD_LIMIT: u64 = 10;
pub const MAX_LEADERBOARD_LIMIT: u64 = 100;
const RECENT_CONTRIBUTIONS: usize = 5;

pub fn clamp_leaderboard_limit(limit: Option<u64>) -> u64 {
    limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT)
}

pub struct NewContribution {
    pub campus_slug: String,
    pub semester: i32,
    pub question_name: String,
    pub subject: String,
    pub topic: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub name: String,
    pub picture: Option<String>,
    pub contribution_count: i32,
    pub contribution_points: i32,
}

#[derive(Debug, Clone)]
pub struct Contribution {
    pub question: QuestionModel,
    pub campus: Option<CampusModel>,
}

pub struct ContributorStats {
    pub user: UserModel,
    pub rank: u64,
    pub contributions: Vec<Contribution>,
}

impl ContributorStats {
    pub fn recent(&self) -> &[Contribution] {
        let end = self.contributions.len().min(RECENT_CONTRIBUTIONS);
        &self.contributions[..end]
    }
}

pub struct ContributionService {
    db: DatabaseConnection,
}

impl ContributionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a contributed question and credit the contributor.
    pub async fn contribute(
        &self,
        user_id: i32,
        input: NewContribution,
    ) -> AppResult<(QuestionModel, CampusModel)> {
        ensure_valid_semester(input.semester)?;

        let contributor = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let campus = Campus::find()
            .filter(campus::Column::Slug.eq(input.campus_slug.trim()))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("Campus"))?;

        let questions = QuestionService::new(self.db.clone());
        if questions
            .name_taken(campus.id, input.semester, &input.question_name)
            .await?
        {
            return Err(AppError::Conflict(DUPLICATE_NAME.to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let new_question = question::ActiveModel {
            question_name: Set(input.question_name.trim().to_string()),
            subject: Set(input.subject.trim().to_string()),
            topic: Set(input.topic.trim().to_string()),
            link: Set(input.link.trim().to_string()),
            semester: Set(input.semester),
            year: Set(None),
            is_approved: Set(true),
            campus_id: Set(Some(campus.id)),
            course_id: Set(None),
            contributor_email: Set(Some(contributor.email.clone())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        // The unique name index settles races the check above cannot see.
        let question = new_question
            .insert(&txn)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_NAME))?;

        let result = User::update_many()
            .col_expr(
                user::Column::ContributionCount,
                Expr::col(user::Column::ContributionCount).add(1),
            )
            .col_expr(
                user::Column::ContributionPoints,
                Expr::col(user::Column::ContributionPoints).add(POINTS_PER_CONTRIBUTION),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(contributor.id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Unauthorized);
        }

        txn.commit().await?;

        tracing::info!(
            user_id = contributor.id,
            question_id = question.id,
            campus = %campus.slug,
            "Question contributed"
        );

        Ok((question, campus))
    }

    /// Take back the credit of one contribution.
    pub async fn revoke<C: ConnectionTrait>(conn: &C, contributor_email: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::ContributionCount,
                Expr::col(user::Column::ContributionCount).sub(1),
            )
            .col_expr(
                user::Column::ContributionPoints,
                Expr::col(user::Column::ContributionPoints).sub(POINTS_PER_CONTRIBUTION),
            )
            .filter(user::Column::Email.eq(contributor_email))
            .filter(user::Column::ContributionCount.gt(0))
            .exec(conn)
            .await?;
        Ok(())
    }

    pub async fn leaderboard(&self, limit: Option<u64>) -> AppResult<Vec<LeaderboardEntry>> {
        let users = User::find()
            .filter(user::Column::ContributionCount.gt(0))
            .order_by_desc(user::Column::ContributionPoints)
            .order_by_desc(user::Column::ContributionCount)
            .order_by_asc(user::Column::Id)
            .limit(clamp_leaderboard_limit(limit))
            .all(&self.db)
            .await?;

        Ok(rank_entries(users))
    }

    pub async fn my_stats(&self, user_id: i32) -> AppResult<ContributorStats> {
        let user = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("User"))?;

        let ahead = User::find()
            .filter(user::Column::ContributionPoints.gt(user.contribution_points))
            .count(&self.db)
            .await?;

        let questions = Question::find()
            .filter(question::Column::ContributorEmail.eq(user.email.as_str()))
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .all(&self.db)
            .await?;

        let campus_ids: Vec<i32> = questions.iter().filter_map(|q| q.campus_id).collect();
        let campuses: HashMap<i32, CampusModel> = if campus_ids.is_empty() {
            HashMap::new()
        } else {
            Campus::find()
                .filter(campus::Column::Id.is_in(campus_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let contributions = questions
            .into_iter()
            .map(|question| Contribution {
                campus: question.campus_id.and_then(|id| campuses.get(&id).cloned()),
                question,
            })
            .collect();

        Ok(ContributorStats {
            user,
            rank: ahead + 1,
            contributions,
        })
    }
}

/// Users arrive already ordered; ranks are their 1-based positions.
fn rank_entries(users: Vec<UserModel>) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: i as u64 + 1,
            name: u.name,
            picture: u.picture,
            contribution_count: u.contribution_count,
            contribution_points: u.contribution_points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, name: &str, count: i32, points: i32) -> UserModel {
        let now = chrono::Utc::now().naive_utc();
        UserModel {
            id,
            firebase_uid: format!("uid-{}", id),
            email: format!("{}@example.com", name),
            name: name.to_string(),
            picture: None,
            is_pro: false,
            is_admin: false,
            contribution_count: count,
            contribution_points: points,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn leaderboard_limit_is_clamped() {
        assert_eq!(clamp_leaderboard_limit(None), 10);
        assert_eq!(clamp_leaderboard_limit(Some(0)), 1);
        assert_eq!(clamp_leaderboard_limit(Some(25)), 25);
        assert_eq!(clamp_leaderboard_limit(Some(5000)), 100);
    }

    #[test]
    fn ranks_follow_order() {
        let entries = rank_entries(vec![user(3, "asha", 4, 40), user(1, "ravi", 2, 20)]);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].name, "asha");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].contribution_points, 20);
    }

    #[test]
    fn recent_is_capped_at_five() {
        let now = chrono::Utc::now().naive_utc();
        let contributions = (1..=7)
            .map(|id| Contribution {
                question: QuestionModel {
                    id,
                    question_name: format!("Q{}", id),
                    subject: "DSA".to_string(),
                    topic: "Arrays".to_string(),
                    link: "https://example.com".to_string(),
                    semester: 1,
                    year: None,
                    is_approved: true,
                    campus_id: None,
                    course_id: None,
                    contributor_email: None,
                    created_at: now,
                    updated_at: now,
                },
                campus: None,
            })
            .collect();
        let stats = ContributorStats {
            user: user(1, "asha", 7, 70),
            rank: 1,
            contributions,
        };
        assert_eq!(stats.recent().len(), 5);
        assert_eq!(stats.recent()[0].question.id, 1);
    }
}
