use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use super::{
    Repository, duplicate_company_code, duplicate_email, duplicate_setting_key,
    format_company_code,
};
use crate::{
    error::AppError,
    models::{AccessRule, Action, Role, Setting, TrendPoint, User, Visitor, VisitorStatus},
    policy::Scope,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, company_id, created_at, updated_at";
const VISITOR_COLUMNS: &str =
    "id, name, email, phone, company_id, status, contact_email, created_at, updated_at";
/// Partial unique index on company codes, see `migrations/0001_init.sql`.
const COMPANY_CODE_KEY: &str = "users_company_code_key";
const ACCESS_RULE_COLUMNS: &str = "id, role, resource, actions, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. All queries are runtime-checked
/// (`sqlx::query_as`), and scoped filters are assembled with `QueryBuilder` so every
/// value is bound as a parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// migrate
    ///
    /// Applies the embedded migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))
    }
}

// --- Row Mapping ---

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    company_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::from_str(&row.role).map_err(AppError::Internal)?,
            company_id: row.company_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct VisitorRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    company_id: String,
    status: String,
    contact_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VisitorRow> for Visitor {
    type Error = AppError;

    fn try_from(row: VisitorRow) -> Result<Self, Self::Error> {
        Ok(Visitor {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company_id: row.company_id,
            status: VisitorStatus::from_str(&row.status).map_err(AppError::Internal)?,
            contact_email: row.contact_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AccessRuleRow {
    id: Uuid,
    role: String,
    resource: String,
    actions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccessRuleRow> for AccessRule {
    type Error = AppError;

    fn try_from(row: AccessRuleRow) -> Result<Self, Self::Error> {
        let actions = row
            .actions
            .iter()
            .map(|a| {
                Action::from_str(a)
                    .map_err(|name| AppError::Internal(format!("stored action: {}", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AccessRule {
            id: row.id,
            role: Role::from_str(&row.role).map_err(AppError::Internal)?,
            resource: row.resource,
            actions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SettingRow {
    id: Uuid,
    key: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Setting {
            id: row.id,
            key: row.key,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Translates a unique-constraint violation into the given conflict, anything else
/// into a database error.
fn on_unique(err: sqlx::Error, conflict: fn() -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return conflict();
        }
    }
    err.into()
}

/// The users table has two unique keys; tell them apart by constraint name.
fn on_user_unique(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(COMPANY_CODE_KEY) => duplicate_company_code(),
                _ => duplicate_email(),
            };
        }
    }
    err.into()
}

/// Appends the scope as `AND` conditions. The builder must already contain a `WHERE`.
/// Visitor rows carry no role, so a role-restricted scope admits none of them.
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: &Scope, has_role_column: bool) {
    if let Some(company_id) = scope.company_id() {
        builder.push(" AND company_id = ");
        builder.push_bind(company_id.to_string());
    }
    if let Some(role) = scope.role() {
        if has_role_column {
            builder.push(" AND role = ");
            builder.push_bind(role.as_str());
        } else {
            builder.push(" AND FALSE");
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// find_company
    ///
    /// A reference that parses as a UUID is matched against the id; anything else
    /// against the company code.
    async fn find_company(&self, reference: &str) -> Result<Option<User>, AppError> {
        let row = match Uuid::parse_str(reference) {
            Ok(id) => {
                let sql = format!(
                    "SELECT {} FROM users WHERE id = $1 AND role = 'company'",
                    USER_COLUMNS
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            Err(_) => {
                let sql = format!(
                    "SELECT {} FROM users WHERE company_id = $1 AND role = 'company'",
                    USER_COLUMNS
                );
                sqlx::query_as::<_, UserRow>(&sql)
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, scope: &Scope) -> Result<Vec<User>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        push_scope(&mut builder, scope, true);
        builder.push(" ORDER BY created_at ASC");

        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await?;
        map_rows(rows)
    }

    async fn count_users(&self, scope: &Scope) -> Result<i64, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_scope(&mut builder, scope, true);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_user(&self, user: User) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {cols}",
            cols = USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.company_id)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(on_user_unique)?;
        User::try_from(row)
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, role = $5, company_id = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.company_id)
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(on_user_unique)?
            .map(User::try_from)
            .transpose()
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// next_company_code
    ///
    /// `nextval` is atomic across connections, so concurrent company creations never
    /// draw the same code.
    async fn next_company_code(&self) -> Result<String, AppError> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('company_code_seq')")
            .fetch_one(&self.pool)
            .await?;
        format_company_code(value)
    }

    async fn get_visitor(&self, id: Uuid) -> Result<Option<Visitor>, AppError> {
        let sql = format!("SELECT {} FROM visitors WHERE id = $1", VISITOR_COLUMNS);
        sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Visitor::try_from)
            .transpose()
    }

    async fn list_visitors(&self, scope: &Scope) -> Result<Vec<Visitor>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM visitors WHERE TRUE", VISITOR_COLUMNS));
        push_scope(&mut builder, scope, false);
        builder.push(" ORDER BY created_at DESC");

        let rows = builder
            .build_query_as::<VisitorRow>()
            .fetch_all(&self.pool)
            .await?;
        map_rows(rows)
    }

    async fn insert_visitor(&self, visitor: Visitor) -> Result<Visitor, AppError> {
        let sql = format!(
            "INSERT INTO visitors ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {cols}",
            cols = VISITOR_COLUMNS
        );
        let row = sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(visitor.id)
            .bind(&visitor.name)
            .bind(&visitor.email)
            .bind(&visitor.phone)
            .bind(&visitor.company_id)
            .bind(visitor.status.as_str())
            .bind(&visitor.contact_email)
            .bind(visitor.created_at)
            .bind(visitor.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Visitor::try_from(row)
    }

    async fn update_visitor(&self, visitor: Visitor) -> Result<Option<Visitor>, AppError> {
        let sql = format!(
            r#"
            UPDATE visitors
            SET name = $2, email = $3, phone = $4, contact_email = $5, updated_at = $6
            WHERE id = $1
            RETURNING {}
            "#,
            VISITOR_COLUMNS
        );
        sqlx::query_as::<_, VisitorRow>(&sql)
            .bind(visitor.id)
            .bind(&visitor.name)
            .bind(&visitor.email)
            .bind(&visitor.phone)
            .bind(&visitor.contact_email)
            .bind(visitor.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .map(Visitor::try_from)
            .transpose()
    }

    /// set_visitor_status
    ///
    /// A single conditional `UPDATE`, so two clicks on decision links cannot both win.
    async fn set_visitor_status(
        &self,
        id: Uuid,
        status: VisitorStatus,
        expected: Option<VisitorStatus>,
    ) -> Result<Option<Visitor>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE visitors SET status = ");
        builder.push_bind(status.as_str());
        builder.push(", updated_at = now() WHERE id = ");
        builder.push_bind(id);
        if let Some(expected) = expected {
            builder.push(" AND status = ");
            builder.push_bind(expected.as_str());
        }
        builder.push(format!(" RETURNING {}", VISITOR_COLUMNS));

        builder
            .build_query_as::<VisitorRow>()
            .fetch_optional(&self.pool)
            .await?
            .map(Visitor::try_from)
            .transpose()
    }

    async fn delete_visitor(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM visitors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn visitor_stats(&self, scope: &Scope) -> Result<(i64, i64), AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'pending') FROM visitors WHERE TRUE",
        );
        push_scope(&mut builder, scope, false);

        let counts = builder
            .build_query_as::<(i64, i64)>()
            .fetch_one(&self.pool)
            .await?;
        Ok(counts)
    }

    async fn visitor_trend(&self, scope: &Scope) -> Result<Vec<TrendPoint>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS day, COUNT(*) \
             FROM visitors WHERE TRUE",
        );
        push_scope(&mut builder, scope, false);
        builder.push(" GROUP BY day ORDER BY day ASC");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(date, count)| TrendPoint { date, count })
            .collect())
    }

    async fn list_settings(&self) -> Result<Vec<Setting>, AppError> {
        let rows = sqlx::query_as::<_, SettingRow>(
            "SELECT id, key, value, created_at, updated_at FROM settings ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Setting::from).collect())
    }

    async fn get_setting(&self, id: Uuid) -> Result<Option<Setting>, AppError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT id, key, value, created_at, updated_at FROM settings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Setting::from))
    }

    async fn insert_setting(&self, setting: Setting) -> Result<Setting, AppError> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            INSERT INTO settings (id, key, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, key, value, created_at, updated_at
            "#,
        )
        .bind(setting.id)
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(setting.created_at)
        .bind(setting.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| on_unique(e, duplicate_setting_key))?;
        Ok(row.into())
    }

    async fn update_setting(&self, setting: Setting) -> Result<Option<Setting>, AppError> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            UPDATE settings SET key = $2, value = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, key, value, created_at, updated_at
            "#,
        )
        .bind(setting.id)
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(setting.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| on_unique(e, duplicate_setting_key))?;
        Ok(row.map(Setting::from))
    }

    async fn delete_setting(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM settings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_access_rules(&self) -> Result<Vec<AccessRule>, AppError> {
        let sql = format!(
            "SELECT {} FROM access_rules ORDER BY role ASC, resource ASC",
            ACCESS_RULE_COLUMNS
        );
        let rows = sqlx::query_as::<_, AccessRuleRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        map_rows(rows)
    }

    async fn get_access_rule(&self, id: Uuid) -> Result<Option<AccessRule>, AppError> {
        let sql = format!("SELECT {} FROM access_rules WHERE id = $1", ACCESS_RULE_COLUMNS);
        sqlx::query_as::<_, AccessRuleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AccessRule::try_from)
            .transpose()
    }

    async fn insert_access_rule(&self, rule: AccessRule) -> Result<AccessRule, AppError> {
        let sql = format!(
            "INSERT INTO access_rules ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = ACCESS_RULE_COLUMNS
        );
        let actions: Vec<&str> = rule.actions.iter().map(Action::as_str).collect();
        let row = sqlx::query_as::<_, AccessRuleRow>(&sql)
            .bind(rule.id)
            .bind(rule.role.as_str())
            .bind(&rule.resource)
            .bind(&actions)
            .bind(rule.created_at)
            .bind(rule.updated_at)
            .fetch_one(&self.pool)
            .await?;
        AccessRule::try_from(row)
    }

    async fn update_access_rule(&self, rule: AccessRule) -> Result<Option<AccessRule>, AppError> {
        let sql = format!(
            r#"
            UPDATE access_rules SET role = $2, resource = $3, actions = $4, updated_at = $5
            WHERE id = $1
            RETURNING {}
            "#,
            ACCESS_RULE_COLUMNS
        );
        let actions: Vec<&str> = rule.actions.iter().map(Action::as_str).collect();
        sqlx::query_as::<_, AccessRuleRow>(&sql)
            .bind(rule.id)
            .bind(rule.role.as_str())
            .bind(&rule.resource)
            .bind(&actions)
            .bind(rule.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .map(AccessRule::try_from)
            .transpose()
    }

    async fn delete_access_rule(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM access_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
