use crate::{
    error::{AppError, AppResult},
    models::{notice, Notice, NoticeModel},
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum NoticePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl NoticePriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Unknown stored values sort with `normal`.
    fn of(model: &NoticeModel) -> Self {
        Self::parse(&model.priority).unwrap_or_default()
    }
}

impl fmt::Display for NoticePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_priority(value: Option<&str>) -> AppResult<NoticePriority> {
    match value {
        None => Ok(NoticePriority::default()),
        Some(raw) => NoticePriority::parse(raw).ok_or_else(|| {
            AppError::Validation("Priority must be one of low, normal, high, urgent".to_string())
        }),
    }
}

/// Accepts RFC 3339 timestamps and stores them as naive UTC.
pub fn parse_expiry(value: Option<&str>) -> AppResult<Option<NaiveDateTime>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.naive_utc()))
            .map_err(|_| {
                AppError::Validation("expires_at must be an RFC 3339 timestamp".to_string())
            }),
    }
}

fn sort_for_display(notices: &mut [NoticeModel]) {
    notices.sort_by(|a, b| {
        NoticePriority::of(b)
            .cmp(&NoticePriority::of(a))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub struct NoticeInput {
    pub title: String,
    pub content: String,
    pub priority: NoticePriority,
    pub is_active: Option<bool>,
    pub expires_at: Option<NaiveDateTime>,
}

pub struct NoticeService {
    db: DatabaseConnection,
}

impl NoticeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active notices that have not expired, most important first.
    pub async fn list_visible(&self) -> AppResult<Vec<NoticeModel>> {
        let now = chrono::Utc::now().naive_utc();
        let mut notices = Notice::find()
            .filter(notice::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(notice::Column::ExpiresAt.is_null())
                    .add(notice::Column::ExpiresAt.gt(now)),
            )
            .all(&self.db)
            .await?;

        sort_for_display(&mut notices);
        Ok(notices)
    }

    pub async fn list_all(&self) -> AppResult<Vec<NoticeModel>> {
        let notices = Notice::find()
            .order_by_desc(notice::Column::CreatedAt)
            .order_by_desc(notice::Column::Id)
            .all(&self.db)
            .await?;
        Ok(notices)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<NoticeModel> {
        Notice::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFoundResource("Notice"))
    }

    pub async fn create(&self, input: NoticeInput) -> AppResult<NoticeModel> {
        let now = chrono::Utc::now().naive_utc();
        let new_notice = notice::ActiveModel {
            title: Set(input.title.trim().to_string()),
            content: Set(input.content),
            priority: Set(input.priority.to_string()),
            is_active: Set(input.is_active.unwrap_or(true)),
            expires_at: Set(input.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(new_notice.insert(&self.db).await?)
    }

    /// Full replacement; an omitted `is_active` keeps the stored flag and
    /// an omitted expiry clears it.
    pub async fn update(&self, id: i32, input: NoticeInput) -> AppResult<NoticeModel> {
        let existing = self.get_by_id(id).await?;
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let mut active: notice::ActiveModel = existing.into();
        active.title = Set(input.title.trim().to_string());
        active.content = Set(input.content);
        active.priority = Set(input.priority.to_string());
        active.is_active = Set(is_active);
        active.expires_at = Set(input.expires_at);
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        Notice::delete_by_id(existing.id).exec(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: i32, priority: &str, minutes_ago: i64) -> NoticeModel {
        let at = chrono::Utc::now().naive_utc() - chrono::Duration::minutes(minutes_ago);
        NoticeModel {
            id,
            title: format!("Notice {}", id),
            content: "Body".to_string(),
            priority: priority.to_string(),
            is_active: true,
            expires_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn priority_parsing() {
        assert_eq!(NoticePriority::parse("URGENT"), Some(NoticePriority::Urgent));
        assert_eq!(NoticePriority::parse(" low "), Some(NoticePriority::Low));
        assert_eq!(NoticePriority::parse("critical"), None);
        assert_eq!(parse_priority(None).unwrap(), NoticePriority::Normal);
        assert!(parse_priority(Some("whenever")).is_err());
    }

    #[test]
    fn priority_ordering() {
        assert!(NoticePriority::Urgent > NoticePriority::High);
        assert!(NoticePriority::High > NoticePriority::Normal);
        assert!(NoticePriority::Normal > NoticePriority::Low);
    }

    #[test]
    fn display_order_is_priority_then_newest() {
        let mut notices = vec![
            notice(1, "low", 1),
            notice(2, "urgent", 30),
            notice(3, "normal", 5),
            notice(4, "urgent", 2),
            notice(5, "bogus", 1),
        ];
        sort_for_display(&mut notices);
        let ids: Vec<i32> = notices.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 2, 5, 3, 1]);
    }

    #[test]
    fn expiry_parsing() {
        assert_eq!(parse_expiry(None).unwrap(), None);
        assert_eq!(parse_expiry(Some("  ")).unwrap(), None);
        let parsed = parse_expiry(Some("2030-01-01T05:30:00+05:30")).unwrap().unwrap();
        assert_eq!(parsed.to_string(), "2030-01-01 00:00:00");
        assert!(parse_expiry(Some("next week")).is_err());
    }
}
