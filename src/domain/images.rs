//! Image domain - DB queries for image records
//!
//! Query functions use the generic Executor pattern, so they work with both
//! `&PgPool` and `&mut PgConnection` (transactions). [`PgImageStore`] wraps
//! them behind the [`ImageRecordStore`] trait the intake pipeline uses.

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::models::{ImageRecord, NewImageRecord};

#[derive(Debug, sqlx::FromRow)]
struct InsertedImage {
    id: i64,
}

/// Insert a new image record and return its id
pub async fn insert_image<'e, E>(executor: E, image: &NewImageRecord) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result: InsertedImage = sqlx::query_as(
        r#"
        INSERT INTO images (label, url, analyze_image, objects)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&image.label)
    .bind(&image.url)
    .bind(image.analyze_image)
    .bind(&image.objects)
    .fetch_one(executor)
    .await?;

    Ok(result.id)
}

/// Get a single image record
pub async fn get_image<'e, E>(executor: E, image_id: i64) -> Result<Option<ImageRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, label, url, analyze_image, objects FROM images
        WHERE id = $1
        "#,
    )
    .bind(image_id)
    .fetch_optional(executor)
    .await
}

/// List image records, optionally only those whose objects contain every tag in `objects`
pub async fn list_images<'e, E>(executor: E, objects: Option<&[String]>) -> Result<Vec<ImageRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, label, url, analyze_image, objects FROM images
        WHERE ($1::text[] IS NULL OR objects @> $1::text[])
        ORDER BY id
        "#,
    )
    .bind(objects)
    .fetch_all(executor)
    .await
}

/// Parse the `objects` query parameter: comma-separated, trimmed, empties
/// dropped. `None` when nothing is left, which means "no filter".
pub fn parse_object_filter(raw: Option<&str>) -> Option<Vec<String>> {
    let tags: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}

/// Persistence for image records
#[async_trait]
pub trait ImageRecordStore: Send + Sync {
    async fn create(&self, image: &NewImageRecord) -> Result<i64, sqlx::Error>;

    /// `Ok(None)` when no record has this id
    async fn get(&self, image_id: i64) -> Result<Option<ImageRecord>, sqlx::Error>;

    async fn list(&self, objects: Option<&[String]>) -> Result<Vec<ImageRecord>, sqlx::Error>;
}

/// Postgres-backed record store
#[derive(Clone)]
pub struct PgImageStore {
    pool: PgPool,
}

impl PgImageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRecordStore for PgImageStore {
    async fn create(&self, image: &NewImageRecord) -> Result<i64, sqlx::Error> {
        insert_image(&self.pool, image).await
    }

    async fn get(&self, image_id: i64) -> Result<Option<ImageRecord>, sqlx::Error> {
        get_image(&self.pool, image_id).await
    }

    async fn list(&self, objects: Option<&[String]>) -> Result<Vec<ImageRecord>, sqlx::Error> {
        list_images(&self.pool, objects).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_object_filter() {
        assert_eq!(parse_object_filter(None), None);
        assert_eq!(parse_object_filter(Some("")), None);
        assert_eq!(parse_object_filter(Some(" , ")), None);
        assert_eq!(parse_object_filter(Some("cat")), Some(tags(&["cat"])));
        assert_eq!(
            parse_object_filter(Some("cat, animal,,")),
            Some(tags(&["cat", "animal"]))
        );
    }

    fn record(label: &str, objects: &[&str]) -> NewImageRecord {
        NewImageRecord {
            label: label.to_string(),
            url: format!("memory://images/{}.png", label),
            analyze_image: !objects.is_empty(),
            objects: tags(objects),
        }
    }

    async fn ids(pool: &PgPool, filter: Option<&str>) -> Vec<i64> {
        let filter = parse_object_filter(filter);
        list_images(pool, filter.as_deref())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_insert_then_get(pool: PgPool) {
        let id = insert_image(&pool, &record("cat", &["cat", "animal"])).await.unwrap();

        let stored = get_image(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.label, "cat");
        assert_eq!(stored.url, "memory://images/cat.png");
        assert!(stored.analyze_image);
        assert_eq!(stored.objects, tags(&["cat", "animal"]));

        assert!(get_image(&pool, 9999).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_uses_containment(pool: PgPool) {
        let cat = insert_image(&pool, &record("cat", &["cat", "animal"])).await.unwrap();
        let dog = insert_image(&pool, &record("dog", &["dog"])).await.unwrap();
        let plain = insert_image(&pool, &record("plain", &[])).await.unwrap();
        assert!(cat < dog && dog < plain);

        assert_eq!(ids(&pool, None).await, vec![cat, dog, plain]);
        assert_eq!(ids(&pool, Some(" , ")).await, vec![cat, dog, plain]);
        assert_eq!(ids(&pool, Some("cat")).await, vec![cat]);
        assert_eq!(ids(&pool, Some("animal,cat")).await, vec![cat]);
        assert_eq!(ids(&pool, Some("dog")).await, vec![dog]);
        assert!(ids(&pool, Some("cat,dog")).await.is_empty());
        assert!(ids(&pool, Some("bird")).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_store_trait_matches_queries(pool: PgPool) {
        let store = PgImageStore::new(pool);
        let id = store.create(&record("cat", &["cat"])).await.unwrap();

        assert_eq!(store.get(id).await.unwrap().map(|r| r.label), Some("cat".to_string()));
        let cats = tags(&["cat"]);
        let dogs = tags(&["dog"]);
        assert_eq!(store.list(Some(cats.as_slice())).await.unwrap().len(), 1);
        assert!(store.list(Some(dogs.as_slice())).await.unwrap().is_empty());
    }
}
