use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::{Announcement, AnnouncementStatus},
    error::Result,
    repository::announcement_repository::{
        AnnouncementRow, SqliteAnnouncementRepository, ANNOUNCEMENT_COLUMNS,
    },
};

use super::{like_pattern, normalize_query, Clause, Filter, FilterValue, Search, SearchQuery};

const GAMES_JOIN: &str = "JOIN games g ON g.id = a.game_id";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementFilter {
    pub game_id: Option<Uuid>,
    pub status: Option<AnnouncementStatus>,
    pub organizer_id: Option<Uuid>,
    pub q: Option<String>,
}

impl Filter for AnnouncementFilter {
    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        let mut values = Vec::new();
        if let Some(id) = self.game_id {
            values.push(("game_id", FilterValue::Uuid(id)));
        }
        if let Some(status) = self.status {
            values.push(("status", FilterValue::Text(status.as_str().to_string())));
        }
        if let Some(id) = self.organizer_id {
            values.push(("organizer_id", FilterValue::Uuid(id)));
        }
        if let Some(ref q) = self.q {
            values.push(("q", FilterValue::Text(q.clone())));
        }
        values
    }
}

/// Announcement search. `q` matches the game name, title and content and
/// ranks results in that order; otherwise newest first.
pub struct AnnouncementSearch {
    pool: SqlitePool,
}

impl AnnouncementSearch {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Search for AnnouncementSearch {
    type Filter = AnnouncementFilter;
    type Row = AnnouncementRow;
    type Item = Announcement;

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn source(&self) -> &'static str {
        "announcements a"
    }

    fn columns(&self) -> &'static str {
        ANNOUNCEMENT_COLUMNS
    }

    fn default_order(&self) -> &'static str {
        "a.created_at DESC, a.id"
    }

    fn equality_column(&self, field: &str) -> Option<&'static str> {
        match field {
            "game_id" => Some("a.game_id"),
            "status" => Some("a.status"),
            "organizer_id" => Some("a.organizer_id"),
            _ => None,
        }
    }

    fn override_filter(&self, field: &str, value: &FilterValue, query: &mut SearchQuery) -> Result<bool> {
        if field != "q" {
            return Ok(false);
        }
        let Some(q) = value.as_text().map(normalize_query).transpose()?.flatten() else {
            return Ok(true);
        };

        let pattern = FilterValue::Text(like_pattern(&q));
        let game = r"g.name_search LIKE ";
        let title = r"a.title_search LIKE ";
        let content = r"COALESCE(a.content_search, '') LIKE ";
        let escape = r" ESCAPE '\'";

        query.join(GAMES_JOIN);
        query.filter(
            Clause::new("(")
                .sql(game)
                .bind(pattern.clone())
                .sql(escape)
                .sql(" OR ")
                .sql(title)
                .bind(pattern.clone())
                .sql(escape)
                .sql(" OR ")
                .sql(content)
                .bind(pattern.clone())
                .sql(escape)
                .sql(")"),
        );
        query.rank(
            Clause::new("CASE WHEN ")
                .sql(game)
                .bind(pattern.clone())
                .sql(escape)
                .sql(" THEN 0 WHEN ")
                .sql(title)
                .bind(pattern.clone())
                .sql(escape)
                .sql(" THEN 1 WHEN ")
                .sql(content)
                .bind(pattern)
                .sql(escape)
                .sql(" THEN 2 ELSE 3 END"),
        );
        Ok(true)
    }

    fn into_item(row: AnnouncementRow) -> Result<Announcement> {
        SqliteAnnouncementRepository::row_to_announcement(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    fn search() -> AnnouncementSearch {
        AnnouncementSearch::new(
            SqlitePoolOptions::new()
                .connect_lazy("sqlite::memory:")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_equality_filters() {
        let search = search();
        let game_id = Uuid::new_v4();
        let filter = AnnouncementFilter {
            game_id: Some(game_id),
            status: Some(AnnouncementStatus::Live),
            ..Default::default()
        };
        let query = search.apply_filters(&filter).unwrap();
        let sql = query.count_sql(search.columns(), search.source());
        assert!(sql.sql().ends_with("WHERE a.game_id = ? AND a.status = ?)"));
        assert!(!sql.sql().contains("JOIN games"));
    }

    #[tokio::test]
    async fn test_text_query_joins_and_ranks() {
        let search = search();
        let filter = AnnouncementFilter {
            q: Some("  Dota ".to_string()),
            ..Default::default()
        };
        let query = search.apply_filters(&filter).unwrap();
        let sql = query.results_sql(search.columns(), search.source(), search.default_order(), 0, 10);
        let sql = sql.sql();

        assert!(sql.contains("JOIN games g ON g.id = a.game_id"));
        assert!(sql.contains("COALESCE(a.content_search, '')"));
        assert!(sql.contains("THEN 0 WHEN a.title_search LIKE"));
        assert!(!sql.contains("LOWER("));
        assert!(sql.contains("ELSE 3 END, a.created_at DESC, a.id"));
    }

    #[tokio::test]
    async fn test_short_text_query_is_ignored() {
        let search = search();
        let filter = AnnouncementFilter {
            q: Some(" d ".to_string()),
            ..Default::default()
        };
        let query = search.apply_filters(&filter).unwrap();
        let sql = query.count_sql(search.columns(), search.source());
        assert!(!sql.sql().contains("WHERE"));
    }
}
