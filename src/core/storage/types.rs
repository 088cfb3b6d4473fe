/// Group identity stamped onto every persisted membership row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    /// Text form of the remote entity id.
    pub id: String,
    pub title: String,
}

impl From<&crate::core::directory::Entity> for GroupRef {
    fn from(entity: &crate::core::directory::Entity) -> Self {
        Self {
            id: entity.id.to_string(),
            title: entity.title.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountRecord {
    pub id: i64,
    pub api_id: i64,
    pub phone: String,
    pub is_ready: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MembershipRow {
    pub id: i64,
    pub account_id: i64,
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_bot: bool,
    pub is_verified: bool,
    pub group_id: String,
    pub group_title: String,
    pub crawled_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiTokenRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
}
