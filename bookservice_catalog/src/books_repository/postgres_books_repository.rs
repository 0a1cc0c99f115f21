use anyhow::Context;
use serde_json::json;
use tokio_postgres::{Client, NoTls, Statement};

use crate::api::{Book, BookDetails, BookField, BookId, Review, ReviewDetails, ReviewId};
use crate::books_repository::{BookRepository, BookRepositoryError};

/// Keeps every book in a single JSONB document, reviews are embedded in its `reader_reviews` array.
/// Each mutation is a single statement, so it is atomic for the touched row.
pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!(
            "Connecting to postgres at {} as {}",
            config.hostname,
            config.username
        );
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            seq             BIGSERIAL PRIMARY KEY,
            id              TEXT NOT NULL UNIQUE,
            params          JSONB NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup table")?;
        Ok(Self { client })
    }
}

/// Containment filter matching books that embed a review with given id
fn review_filter(review_id: &ReviewId) -> serde_json::Value {
    json!([{ "_id": review_id }])
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn list_books(&self, offset: u64, limit: u64) -> Result<Vec<Book>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT params FROM books ORDER BY seq OFFSET ($1) LIMIT ($2)")
            .await?;

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.client.query(&stmt, &[&offset, &limit]).await?;

        rows.iter()
            .map(|row| {
                let params: serde_json::Value = row.try_get(0)?;
                Ok(serde_json::from_value(params)?)
            })
            .collect()
    }

    async fn add_book(&self, details: BookDetails) -> Result<BookId, BookRepositoryError> {
        let book = Book::new(BookId::generate(), details);
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO books (id, params) VALUES ($1, $2) RETURNING id")
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&book.id.as_str(), &json!(book)])
            .await?;

        if rows.is_empty() {
            return Err(BookRepositoryError::Other("Id not returned".to_string()));
        }
        Ok(book.id)
    }

    async fn get_book(&self, book_id: &BookId) -> Result<Book, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT params FROM books WHERE id = ($1)")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id.as_str()]).await?;

        let params: serde_json::Value = rows
            .first()
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))?
            .try_get(0)?;

        Ok(serde_json::from_value(params)?)
    }

    async fn get_book_field(
        &self,
        book_id: &BookId,
        field: BookField,
    ) -> Result<String, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT params ->> ($2)::TEXT FROM books WHERE id = ($1)")
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&book_id.as_str(), &field.key()])
            .await?;

        let value: Option<String> = rows
            .first()
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))?
            .try_get(0)?;

        Ok(value.unwrap_or_default())
    }

    async fn update_book(
        &self,
        book_id: &BookId,
        details: BookDetails,
    ) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("UPDATE books SET params = params || ($1)::JSONB WHERE id = ($2) RETURNING id")
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&json!(details), &book_id.as_str()])
            .await?;
        Ok(!rows.is_empty())
    }

    async fn delete_book(&self, book_id: &BookId) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM books WHERE id = ($1) RETURNING id")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id.as_str()]).await?;
        Ok(!rows.is_empty())
    }

    async fn list_reviews(&self, book_id: &BookId) -> Result<Vec<Review>, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT params -> 'reader_reviews' FROM books WHERE id = ($1)")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id.as_str()]).await?;

        let reviews: serde_json::Value = rows
            .first()
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))?
            .try_get(0)?;

        Ok(serde_json::from_value(reviews)?)
    }

    async fn add_review(
        &self,
        book_id: &BookId,
        details: ReviewDetails,
    ) -> Result<ReviewId, BookRepositoryError> {
        let review = Review::new(ReviewId::generate(), details);
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE books
                 SET params = jsonb_set(params, '{reader_reviews}', (params -> 'reader_reviews') || ($1)::JSONB)
                 WHERE id = ($2)
                 RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&json!([review]), &book_id.as_str()])
            .await?;

        if rows.is_empty() {
            Err(BookRepositoryError::BookNotFound(book_id.clone()))
        } else {
            Ok(review.id)
        }
    }

    async fn get_review(&self, review_id: &ReviewId) -> Result<Review, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT review
                 FROM books, jsonb_array_elements(params -> 'reader_reviews') AS review
                 WHERE params -> 'reader_reviews' @> ($1)::JSONB AND review ->> '_id' = ($2)::TEXT
                 LIMIT 1",
            )
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&review_filter(review_id), &review_id.as_str()])
            .await?;

        let review: serde_json::Value = rows
            .first()
            .ok_or_else(|| BookRepositoryError::ReviewNotFound(review_id.clone()))?
            .try_get(0)?;

        Ok(serde_json::from_value(review)?)
    }

    async fn update_review(
        &self,
        review_id: &ReviewId,
        details: ReviewDetails,
    ) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE books
                 SET params = jsonb_set(params, '{reader_reviews}', (
                     SELECT jsonb_agg(
                         CASE WHEN review ->> '_id' = ($2)::TEXT THEN review || ($3)::JSONB ELSE review END
                         ORDER BY position)
                     FROM jsonb_array_elements(params -> 'reader_reviews') WITH ORDINALITY AS t(review, position)
                 ))
                 WHERE params -> 'reader_reviews' @> ($1)::JSONB
                 RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[&review_filter(review_id), &review_id.as_str(), &json!(details)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn remove_review(
        &self,
        book_id: &BookId,
        review_id: &ReviewId,
    ) -> Result<bool, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE books
                 SET params = jsonb_set(params, '{reader_reviews}', (
                     SELECT COALESCE(
                         jsonb_agg(review ORDER BY position) FILTER (WHERE review ->> '_id' <> ($3)::TEXT),
                         '[]'::JSONB)
                     FROM jsonb_array_elements(params -> 'reader_reviews') WITH ORDINALITY AS t(review, position)
                 ))
                 WHERE id = ($1) AND params -> 'reader_reviews' @> ($2)::JSONB
                 RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[&book_id.as_str(), &review_filter(review_id), &review_id.as_str()],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod postgres_book_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::api::{BookDetails, BookField, BookId, ReviewDetails, ReviewId};
    use crate::books_repository::{
        BookRepository, BookRepositoryError, PostgresBooksRepository,
        PostgresBooksRepositoryConfig,
    };

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresBooksRepository) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
                hostname: "127.0.0.1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            })
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn book_details(title: &str) -> BookDetails {
        BookDetails {
            author: "Jane Austen".to_string(),
            title: title.to_string(),
            country: "United Kingdom".to_string(),
            language: "English".to_string(),
            cover_image: "https://example.com/covers/pride.jpg".to_string(),
            pages: "226".to_string(),
            year: "1813".to_string(),
        }
    }

    fn review_details(name: &str) -> ReviewDetails {
        ReviewDetails {
            name: name.to_string(),
            comments: "Witty".to_string(),
            book_rating: "4".to_string(),
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers book management: add, get, projections, pagination, update and delete
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_book_management() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let not_existing_book_id = BookId::generate();
        assert!(matches!(
            repo.get_book(&not_existing_book_id).await,
            Err(BookRepositoryError::BookNotFound(..))
        ));
        assert!(!repo
            .update_book(&not_existing_book_id, book_details("x"))
            .await
            .expect("Failed to update"));
        assert!(repo.list_books(0, 15).await.unwrap().is_empty());

        let mut ids = vec![];
        for i in 0..3 {
            ids.push(
                repo.add_book(book_details(&format!("title{}", i)))
                    .await
                    .expect("Failed to add book"),
            );
        }

        let book = repo.get_book(&ids[0]).await.expect("Failed to get book");
        assert_eq!(book.id, ids[0]);
        assert_eq!(book.details(), book_details("title0"));
        assert!(book.reader_reviews.is_empty());

        assert_eq!(
            repo.get_book_field(&ids[1], BookField::Title).await.unwrap(),
            "title1"
        );
        assert_eq!(
            repo.get_book_field(&ids[1], BookField::Year).await.unwrap(),
            "1813"
        );

        let second_page: Vec<BookId> = repo
            .list_books(2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.id)
            .collect();
        assert_eq!(second_page, vec![ids[2].clone()]);

        let new_details = BookDetails {
            title: "patched".to_string(),
            ..book_details("")
        };
        assert!(repo.update_book(&ids[0], new_details.clone()).await.unwrap());
        assert_eq!(repo.get_book(&ids[0]).await.unwrap().details(), new_details);

        assert!(repo.delete_book(&ids[0]).await.unwrap());
        assert!(!repo.delete_book(&ids[0]).await.unwrap());
        assert_eq!(repo.list_books(0, 15).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers review management on embedded review arrays
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_review_management() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        assert!(matches!(
            repo.add_review(&BookId::generate(), review_details("Nobody"))
                .await,
            Err(BookRepositoryError::BookNotFound(..))
        ));

        let book_1 = repo.add_book(book_details("first")).await.unwrap();
        let book_2 = repo.add_book(book_details("second")).await.unwrap();

        let review_1 = repo.add_review(&book_1, review_details("Ann")).await.unwrap();
        let review_2 = repo.add_review(&book_1, review_details("Bob")).await.unwrap();
        let review_3 = repo.add_review(&book_2, review_details("Cid")).await.unwrap();

        let names: Vec<String> = repo
            .list_reviews(&book_1)
            .await
            .unwrap()
            .into_iter()
            .map(|review| review.name)
            .collect();
        assert_eq!(names, vec!["Ann".to_string(), "Bob".to_string()]);

        let review = repo.get_review(&review_3).await.unwrap();
        assert_eq!(review.details(), review_details("Cid"));
        assert!(matches!(
            repo.get_review(&ReviewId::generate()).await,
            Err(BookRepositoryError::ReviewNotFound(..))
        ));

        let changed = ReviewDetails {
            comments: "Changed my mind".to_string(),
            ..review_details("Bob")
        };
        assert!(repo.update_review(&review_2, changed.clone()).await.unwrap());
        assert!(!repo
            .update_review(&ReviewId::generate(), changed.clone())
            .await
            .unwrap());

        let reviews = repo.list_reviews(&book_1).await.unwrap();
        assert_eq!(reviews[0].id, review_1);
        assert_eq!(reviews[1].id, review_2);
        assert_eq!(reviews[1].details(), changed);

        assert!(!repo.remove_review(&book_2, &review_1).await.unwrap());
        assert!(repo.remove_review(&book_1, &review_1).await.unwrap());
        assert!(repo.remove_review(&book_1, &review_2).await.unwrap());
        assert!(repo.list_reviews(&book_1).await.unwrap().is_empty());
        assert_eq!(repo.list_reviews(&book_2).await.unwrap().len(), 1);
    }
}
