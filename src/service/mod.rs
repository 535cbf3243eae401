pub mod announcement_service;
pub mod game_service;
pub mod registration_service;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::policy::{AuthorizationService, PermissionsService, PolicyRegistry};
use crate::repository::*;
use crate::search::{AnnouncementSearch, GameSearch};

pub use announcement_service::AnnouncementService;
pub use game_service::GameService;
pub use registration_service::RegistrationService;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub game_repo: Arc<dyn GameRepository>,
    pub announcement_repo: Arc<dyn AnnouncementRepository>,
    pub registration_repo: Arc<dyn RegistrationRepository>,
    pub policy_registry: Arc<PolicyRegistry>,
    pub authorization: Arc<AuthorizationService>,
    pub permissions: Arc<PermissionsService>,
    pub auth_service: Arc<AuthService>,
    pub game_service: Arc<GameService>,
    pub announcement_service: Arc<AnnouncementService>,
    pub registration_service: Arc<RegistrationService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool) -> Self {
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let game_repo: Arc<dyn GameRepository> =
            Arc::new(SqliteGameRepository::new(db_pool.clone()));
        let announcement_repo: Arc<dyn AnnouncementRepository> =
            Arc::new(SqliteAnnouncementRepository::new(db_pool.clone()));
        let registration_repo: Arc<dyn RegistrationRepository> =
            Arc::new(SqliteRegistrationRepository::new(db_pool.clone()));

        let policy_registry = Arc::new(PolicyRegistry::default());
        let authorization = Arc::new(AuthorizationService::new(policy_registry.clone()));
        let permissions = Arc::new(PermissionsService::new(policy_registry.clone()));
        let auth_service = Arc::new(AuthService::new(db_pool.clone(), user_repo.clone()));

        let game_service = Arc::new(GameService::new(
            game_repo.clone(),
            GameSearch::new(db_pool.clone()),
            authorization.clone(),
        ));
        let announcement_service = Arc::new(AnnouncementService::new(
            announcement_repo.clone(),
            game_repo.clone(),
            registration_repo.clone(),
            AnnouncementSearch::new(db_pool.clone()),
            authorization.clone(),
        ));
        let registration_service = Arc::new(RegistrationService::new(
            registration_repo.clone(),
            announcement_repo.clone(),
            authorization.clone(),
        ));

        Self {
            user_repo,
            game_repo,
            announcement_repo,
            registration_repo,
            policy_registry,
            authorization,
            permissions,
            auth_service,
            game_service,
            announcement_service,
            registration_service,
            db_pool,
        }
    }
}
