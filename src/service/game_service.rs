use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{CreateGameRequest, Game, GameDetails, UpdateGameRequest, User},
    error::{AppError, Result},
    policy::{AuthorizationService, EntityKind},
    repository::GameRepository,
    search::{GameFilter, GameSearch, Search},
};

pub struct GameService {
    repo: Arc<dyn GameRepository>,
    search: GameSearch,
    authorization: Arc<AuthorizationService>,
}

impl GameService {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        search: GameSearch,
        authorization: Arc<AuthorizationService>,
    ) -> Self {
        Self { repo, search, authorization }
    }

    pub async fn create(&self, user: Option<&User>, request: CreateGameRequest) -> Result<Game> {
        self.authorization.authorize_global(user, EntityKind::Game, "create")?;
        request.validate()?;
        self.ensure_name_available(&request.name, None).await?;

        let game = self.repo.create(request).await?;
        tracing::info!("Created game {} ({})", game.name, game.id);
        Ok(game)
    }

    pub async fn get(&self, id: Uuid) -> Result<GameDetails> {
        let game = self.find(id).await?;
        let announcements_count = self.repo.count_announcements(id).await?;
        Ok(GameDetails { game, announcements_count })
    }

    pub async fn update(&self, user: Option<&User>, id: Uuid, request: UpdateGameRequest) -> Result<Game> {
        let game = self.find(id).await?;
        self.authorization.authorize(user, &game, "edit")?;
        request.validate()?;

        if let Some(ref name) = request.name {
            self.ensure_name_available(name, Some(id)).await?;
        }

        self.repo.update(id, request).await
    }

    pub async fn delete(&self, user: Option<&User>, id: Uuid) -> Result<()> {
        let game = self.find(id).await?;
        self.authorization.authorize(user, &game, "delete")?;
        self.repo.delete(id).await?;
        tracing::info!("Deleted game {}", id);
        Ok(())
    }

    /// One page of games matching `filter`, plus the total.
    pub async fn search(&self, filter: &GameFilter, skip: i64, limit: i64) -> Result<(Vec<Game>, i64)> {
        let items = self.search.results(filter, skip, limit).await?;
        let count = self.search.count(filter).await?;
        Ok((items, count))
    }

    async fn find(&self, id: Uuid) -> Result<Game> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Game not found".to_string()))
    }

    async fn ensure_name_available(&self, name: &str, current: Option<Uuid>) -> Result<()> {
        match self.repo.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => Err(AppError::Validation(format!(
                "Game with name '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }
}
