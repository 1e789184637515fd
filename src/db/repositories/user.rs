use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, sea_query::Expr,
};

use super::parse_timestamp;
use crate::db::StoreError;
use crate::domain::UserId;
use crate::entities::users;
use crate::models::{NewUser, User};

impl TryFrom<users::Model> for User {
    type Error = StoreError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(model.id),
            username: model.username,
            email: model.email,
            created_at: Some(parse_timestamp(&model.created_at)?),
            last_login: model.last_login.as_deref().map(parse_timestamp).transpose()?,
            login_streak: u32::try_from(model.login_streak).unwrap_or(0),
        })
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a new user. The existence check gives a clean conflict message;
    /// the unique indexes still catch a concurrent duplicate.
    pub async fn create(&self, user: NewUser) -> Result<UserId, StoreError> {
        let existing = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(&user.username))
                    .add(users::Column::Email.eq(&user.email)),
            )
            .one(&self.conn)
            .await?;

        if existing.is_some() {
            return Err(StoreError::Conflict(
                "Username or email is already in use".to_string(),
            ));
        }

        let active = users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            last_login: Set(None),
            login_streak: Set(0),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(UserId::new(model.id))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Get user by username with password hash (for credential checks)
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let Some(model) = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let password_hash = model.password_hash.clone();
        Ok(Some((User::try_from(model)?, password_hash)))
    }

    pub async fn update_login_streak(&self, id: UserId, streak: u32) -> Result<(), StoreError> {
        let streak = i32::try_from(streak).unwrap_or(i32::MAX);
        let now = chrono::Utc::now().to_rfc3339();

        users::Entity::update_many()
            .col_expr(users::Column::LoginStreak, Expr::value(streak))
            .col_expr(users::Column::LastLogin, Expr::value(Some(now)))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn has_users(&self) -> Result<bool, StoreError> {
        let count = users::Entity::find().count(&self.conn).await?;
        Ok(count > 0)
    }
}
