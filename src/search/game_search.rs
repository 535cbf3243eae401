use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    domain::Game,
    error::Result,
    repository::game_repository::{GameRow, SqliteGameRepository, GAME_COLUMNS},
};

use super::{like_pattern, normalize_query, Clause, Filter, FilterValue, Search, SearchQuery};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameFilter {
    pub name: Option<String>,
    pub q: Option<String>,
}

impl Filter for GameFilter {
    fn values(&self) -> Vec<(&'static str, FilterValue)> {
        let mut values = Vec::new();
        if let Some(ref name) = self.name {
            values.push(("name", FilterValue::Text(name.clone())));
        }
        if let Some(ref q) = self.q {
            values.push(("q", FilterValue::Text(q.clone())));
        }
        values
    }
}

pub struct GameSearch {
    pool: SqlitePool,
}

impl GameSearch {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Search for GameSearch {
    type Filter = GameFilter;
    type Row = GameRow;
    type Item = Game;

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn source(&self) -> &'static str {
        "games g"
    }

    fn columns(&self) -> &'static str {
        GAME_COLUMNS
    }

    fn default_order(&self) -> &'static str {
        "g.name ASC, g.id"
    }

    fn equality_column(&self, field: &str) -> Option<&'static str> {
        match field {
            "name" => Some("g.name"),
            _ => None,
        }
    }

    fn override_filter(&self, field: &str, value: &FilterValue, query: &mut SearchQuery) -> Result<bool> {
        if field != "q" {
            return Ok(false);
        }
        if let Some(q) = value.as_text().map(normalize_query).transpose()?.flatten() {
            query.filter(
                Clause::new("g.name_search LIKE ")
                    .bind(FilterValue::Text(like_pattern(&q)))
                    .sql(r" ESCAPE '\'"),
            );
        }
        Ok(true)
    }

    fn into_item(row: GameRow) -> Result<Game> {
        SqliteGameRepository::row_to_game(row)
    }
}
