use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::{
    entity::{Member, MemberKey, NewsArticle, Organization},
    ingest::MergedRecord,
    Error, Result,
};

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    founded_date TEXT,
    headquarters TEXT,
    ideology TEXT,
    source_url TEXT,
    attributes TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    name_key TEXT NOT NULL,
    role_key TEXT NOT NULL,
    bio TEXT,
    start_date TEXT,
    end_date TEXT,
    is_current INTEGER,
    last_updated TEXT NOT NULL,
    UNIQUE (organization_id, name_key, role_key)
);

CREATE INDEX IF NOT EXISTS idx_members_org ON members(organization_id);

CREATE TABLE IF NOT EXISTS news_articles (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    content TEXT,
    source TEXT,
    published_date TEXT,
    url TEXT NOT NULL CHECK (length(url) > 0),
    fetched_at TEXT NOT NULL,
    UNIQUE (organization_id, url)
);

CREATE INDEX IF NOT EXISTS idx_news_org ON news_articles(organization_id);
";

type OrganizationRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

type MemberRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<bool>,
    String,
);

type NewsRow = (String, Option<String>, Option<String>, Option<String>, String);

const ORGANIZATION_COLUMNS: &str = "id, name, description, founded_date, headquarters, ideology, source_url, attributes, created_at, last_updated";

/// Counts from one upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub organization_id: Uuid,
    pub created: bool,
    pub members_written: usize,
    pub articles_written: usize,
    pub articles_skipped: usize,
}

/// A stored organization with everything attached to it
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationProfile {
    #[serde(flatten)]
    pub organization: Organization,
    pub members: Vec<Member>,
    pub news: Vec<NewsArticle>,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        tracing::debug!("Opened database at {}", path);
        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // One connection that never idles out; each new connection would be a new empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Write one processing run's results in a single transaction.
    ///
    /// The organization row is created or updated in place: a stored
    /// description is only replaced by a longer one, other scalars are
    /// overwritten by new non-empty values and attributes are merged.
    /// Members are keyed on normalized (name, role); articles on URL, with
    /// unchanged duplicates skipped. Any failure rolls back the whole batch.
    pub async fn upsert(
        &self,
        name: &str,
        record: &MergedRecord,
        articles: &[NewsArticle],
    ) -> Result<UpsertSummary> {
        if name.trim().is_empty() {
            return Err(Error::InvalidRecord("organization name is empty".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let existing = fetch_organization(&mut tx, name).await?;
        let created = existing.is_none();
        let organization = merge_into(existing.unwrap_or_else(|| Organization::new(name.to_string())), record);

        sqlx::query(
            r"
            INSERT INTO organizations (id, name, description, founded_date, headquarters, ideology, source_url, attributes, created_at, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                founded_date = excluded.founded_date,
                headquarters = excluded.headquarters,
                ideology = excluded.ideology,
                source_url = excluded.source_url,
                attributes = excluded.attributes,
                last_updated = excluded.last_updated
            ",
        )
        .bind(organization.id.to_string())
        .bind(&organization.name)
        .bind(&organization.description)
        .bind(&organization.founded_date)
        .bind(&organization.headquarters)
        .bind(&organization.ideology)
        .bind(&organization.source_url)
        .bind(serde_json::to_string(&organization.attributes)?)
        .bind(organization.created_at.to_rfc3339())
        .bind(organization.last_updated.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let now = Utc::now().to_rfc3339();
        let org_id = organization.id.to_string();

        let mut members_written = 0;
        for member in &record.members {
            let key = MemberKey::new(&member.name, &member.role);

            sqlx::query(
                r"
                INSERT INTO members (id, organization_id, name, role, name_key, role_key, bio, start_date, end_date, is_current, last_updated)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(organization_id, name_key, role_key) DO UPDATE SET
                    bio = COALESCE(excluded.bio, members.bio),
                    start_date = COALESCE(excluded.start_date, members.start_date),
                    end_date = COALESCE(excluded.end_date, members.end_date),
                    is_current = COALESCE(excluded.is_current, members.is_current),
                    last_updated = excluded.last_updated
                ",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(&org_id)
            .bind(member.name.trim())
            .bind(member.role.trim())
            .bind(&key.name)
            .bind(&key.role)
            .bind(&member.bio)
            .bind(&member.start_date)
            .bind(&member.end_date)
            .bind(member.is_current)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            members_written += 1;
        }

        let mut articles_written = 0;
        let mut articles_skipped = 0;
        for article in articles {
            let result = sqlx::query(
                r"
                INSERT INTO news_articles (id, organization_id, title, content, source, published_date, url, fetched_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(organization_id, url) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content,
                    source = excluded.source,
                    published_date = excluded.published_date,
                    fetched_at = excluded.fetched_at
                WHERE news_articles.title IS NOT excluded.title
                    OR news_articles.content IS NOT excluded.content
                    OR news_articles.source IS NOT excluded.source
                    OR news_articles.published_date IS NOT excluded.published_date
                ",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(&org_id)
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.source)
            .bind(&article.published_date)
            .bind(&article.url)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                articles_skipped += 1;
            } else {
                articles_written += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            organization = name,
            created,
            members = members_written,
            articles = articles_written,
            skipped = articles_skipped,
            "Stored organization"
        );

        Ok(UpsertSummary {
            organization_id: organization.id,
            created,
            members_written,
            articles_written,
            articles_skipped,
        })
    }

    pub async fn get_organization(&self, name: &str) -> Result<Organization> {
        let row: Option<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_organization_row)
            .transpose()?
            .ok_or_else(|| Error::OrganizationNotFound(name.to_string()))
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_organization_row).collect()
    }

    pub async fn list_members(&self, organization_id: Uuid) -> Result<Vec<Member>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r"
            SELECT id, organization_id, name, role, bio, start_date, end_date, is_current, last_updated
            FROM members WHERE organization_id = ? ORDER BY rowid
            ",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_member_row).collect()
    }

    pub async fn list_news(&self, organization_id: Uuid) -> Result<Vec<NewsArticle>> {
        let rows: Vec<NewsRow> = sqlx::query_as(
            r"
            SELECT title, content, source, published_date, url
            FROM news_articles WHERE organization_id = ?
            ORDER BY published_date DESC, rowid
            ",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(title, content, source, published_date, url)| NewsArticle {
                title,
                content,
                source,
                published_date,
                url,
            })
            .collect())
    }

    pub async fn get_profile(&self, name: &str) -> Result<OrganizationProfile> {
        let organization = self.get_organization(name).await?;
        let members = self.list_members(organization.id).await?;
        let news = self.list_news(organization.id).await?;

        Ok(OrganizationProfile {
            organization,
            members,
            news,
        })
    }
}

async fn fetch_organization(conn: &mut SqliteConnection, name: &str) -> Result<Option<Organization>> {
    let row: Option<OrganizationRow> = sqlx::query_as(&format!(
        "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE name = ?"
    ))
    .bind(name)
    .fetch_optional(conn)
    .await?;

    row.map(parse_organization_row).transpose()
}

fn merge_into(mut organization: Organization, record: &MergedRecord) -> Organization {
    if let Some(description) = present(record.description.as_ref()) {
        let longer = organization
            .description
            .as_ref()
            .is_none_or(|current| description.chars().count() > current.chars().count());
        if longer {
            organization.description = Some(description.clone());
        }
    }

    overwrite(&mut organization.founded_date, record.founded_date.as_ref());
    overwrite(&mut organization.headquarters, record.headquarters.as_ref());
    overwrite(&mut organization.ideology, record.ideology.as_ref());
    overwrite(&mut organization.source_url, record.source_url.as_ref());

    for (key, value) in &record.attributes {
        if !value.trim().is_empty() {
            organization.attributes.insert(key.clone(), value.clone());
        }
    }

    organization.last_updated = Utc::now();
    organization
}

fn present(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.trim().is_empty())
}

fn overwrite(slot: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = present(value) {
        *slot = Some(value.clone());
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidRecord(format!("bad timestamp {value:?}: {e}")))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|e| Error::InvalidRecord(format!("bad id {value:?}: {e}")))
}

fn parse_organization_row(row: OrganizationRow) -> Result<Organization> {
    let (
        id,
        name,
        description,
        founded_date,
        headquarters,
        ideology,
        source_url,
        attributes,
        created_at,
        last_updated,
    ) = row;

    let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)?;

    Ok(Organization {
        id: parse_uuid(&id)?,
        name,
        description,
        founded_date,
        headquarters,
        ideology,
        source_url,
        attributes,
        created_at: parse_timestamp(&created_at)?,
        last_updated: parse_timestamp(&last_updated)?,
    })
}

fn parse_member_row(row: MemberRow) -> Result<Member> {
    let (id, organization_id, name, role, bio, start_date, end_date, is_current, last_updated) =
        row;

    Ok(Member {
        id: parse_uuid(&id)?,
        organization_id: parse_uuid(&organization_id)?,
        name,
        role,
        bio,
        start_date,
        end_date,
        is_current,
        last_updated: parse_timestamp(&last_updated)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::CandidateMember;

    fn record(description: &str, members: &[(&str, &str)]) -> MergedRecord {
        MergedRecord {
            description: Some(description.to_string()),
            members: members
                .iter()
                .map(|(name, role)| CandidateMember::new((*name).into(), (*role).into()))
                .collect(),
            ..Default::default()
        }
    }

    fn article(url: &str, title: &str) -> NewsArticle {
        NewsArticle::new(title.into(), url.into())
    }

    #[tokio::test]
    async fn test_upsert_creates_organization() {
        let storage = Storage::open_memory().await.unwrap();

        let summary = storage
            .upsert(
                "Acme Org",
                &record("A party.", &[("Jane Doe", "President")]),
                &[article("https://news.example/1", "One")],
            )
            .await
            .unwrap();

        assert!(summary.created);
        assert_eq!(summary.members_written, 1);
        assert_eq!(summary.articles_written, 1);

        let profile = storage.get_profile("Acme Org").await.unwrap();
        assert_eq!(profile.organization.description.as_deref(), Some("A party."));
        assert_eq!(profile.members[0].name, "Jane Doe");
        assert_eq!(profile.news[0].url, "https://news.example/1");
    }

    #[tokio::test]
    async fn test_repeated_upsert_keeps_one_row_and_longer_description() {
        let storage = Storage::open_memory().await.unwrap();

        let first = storage
            .upsert(
                "Acme Org",
                &record("A longer description of the party.", &[("Jane Doe", "President")]),
                &[],
            )
            .await
            .unwrap();
        let second = storage
            .upsert(
                "Acme Org",
                &record("Shorter.", &[("jane  doe", "President."), ("John Roe", "Treasurer")]),
                &[],
            )
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(first.organization_id, second.organization_id);

        let organizations = storage.list_organizations().await.unwrap();
        assert_eq!(organizations.len(), 1);
        assert_eq!(
            organizations[0].description.as_deref(),
            Some("A longer description of the party.")
        );

        let members = storage.list_members(first.organization_id).await.unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Doe", "John Roe"]);
    }

    #[tokio::test]
    async fn test_scalars_overwritten_by_new_values_only() {
        let storage = Storage::open_memory().await.unwrap();

        let mut first = record("Desc", &[]);
        first.headquarters = Some("Springfield".into());
        first.founded_date = Some("1990".into());
        storage.upsert("Acme Org", &first, &[]).await.unwrap();

        let mut second = MergedRecord::default();
        second.headquarters = Some("Shelbyville".into());
        second.attributes.insert("status".into(), "Registered".into());
        storage.upsert("Acme Org", &second, &[]).await.unwrap();

        let org = storage.get_organization("Acme Org").await.unwrap();
        assert_eq!(org.headquarters.as_deref(), Some("Shelbyville"));
        assert_eq!(org.founded_date.as_deref(), Some("1990"));
        assert_eq!(org.attributes["status"], "Registered");
        assert!(org.last_updated >= org.created_at);
    }

    #[tokio::test]
    async fn test_member_update_keeps_existing_fields() {
        let storage = Storage::open_memory().await.unwrap();

        let mut first = MergedRecord::default();
        first.members.push(
            CandidateMember::new("Jane Doe".into(), "President".into()).with_bio("Bio one.".into()),
        );
        let summary = storage.upsert("Acme Org", &first, &[]).await.unwrap();

        let mut second = MergedRecord::default();
        second
            .members
            .push(CandidateMember::new("Jane Doe".into(), "President".into()).with_current(true));
        storage.upsert("Acme Org", &second, &[]).await.unwrap();

        let members = storage.list_members(summary.organization_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].bio.as_deref(), Some("Bio one."));
        assert_eq!(members[0].is_current, Some(true));
    }

    #[tokio::test]
    async fn test_duplicate_articles_are_skipped() {
        let storage = Storage::open_memory().await.unwrap();
        let articles = [article("https://news.example/1", "One")];

        storage
            .upsert("Acme Org", &MergedRecord::default(), &articles)
            .await
            .unwrap();
        let summary = storage
            .upsert("Acme Org", &MergedRecord::default(), &articles)
            .await
            .unwrap();

        assert_eq!(summary.articles_written, 0);
        assert_eq!(summary.articles_skipped, 1);

        let changed = [article("https://news.example/1", "One (updated)")];
        let summary = storage
            .upsert("Acme Org", &MergedRecord::default(), &changed)
            .await
            .unwrap();
        assert_eq!(summary.articles_written, 1);

        let news = storage.list_news(summary.organization_id).await.unwrap();
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title, "One (updated)");
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let storage = Storage::open_memory().await.unwrap();

        let result = storage
            .upsert(
                "Acme Org",
                &record("A party.", &[("Jane Doe", "President")]),
                &[article("https://news.example/1", "One"), article("", "No URL")],
            )
            .await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert!(storage.list_organizations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let storage = Storage::open_memory().await.unwrap();
        let result = storage.upsert("  ", &MergedRecord::default(), &[]).await;
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_missing_organization() {
        let storage = Storage::open_memory().await.unwrap();
        assert!(matches!(
            storage.get_organization("Nobody").await,
            Err(Error::OrganizationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_names_are_case_sensitive() {
        let storage = Storage::open_memory().await.unwrap();
        storage.upsert("Acme Org", &MergedRecord::default(), &[]).await.unwrap();
        storage.upsert("ACME ORG", &MergedRecord::default(), &[]).await.unwrap();

        assert_eq!(storage.list_organizations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orgs.db");
        let path = path.to_str().unwrap();

        {
            let storage = Storage::open(path).await.unwrap();
            storage
                .upsert("Acme Org", &record("A party.", &[]), &[])
                .await
                .unwrap();
        }

        let reopened = Storage::open(path).await.unwrap();
        assert_eq!(
            reopened.get_organization("Acme Org").await.unwrap().description.as_deref(),
            Some("A party.")
        );
    }
}
