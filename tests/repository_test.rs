mod common;

use common::setup_pool;
use tourney::{
    domain::{CreateGameRequest, CreateUserRequest, UpdateGameRequest},
    repository::{GameRepository, SqliteGameRepository, SqliteUserRepository, UserRepository},
};

#[tokio::test]
async fn test_user_crud() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqliteUserRepository::new(pool.clone());

    // Create
    let user = repo
        .create(CreateUserRequest {
            email: "player@example.com".to_string(),
            nickname: Some("player".to_string()),
            is_superuser: false,
        })
        .await?;
    assert_eq!(user.email, "player@example.com");
    assert!(user.is_active);
    assert!(!user.is_verified);
    assert!(!user.is_superuser);

    // Find by ID
    let found = repo.find_by_id(user.id).await?;
    assert_eq!(found, Some(user.clone()));

    // Find by email
    let found_by_email = repo.find_by_email("player@example.com").await?;
    assert_eq!(found_by_email.map(|u| u.id), Some(user.id));
    assert!(repo.find_by_email("nobody@example.com").await?.is_none());

    // Emails are unique
    let duplicate = repo
        .create(CreateUserRequest {
            email: "player@example.com".to_string(),
            nickname: None,
            is_superuser: false,
        })
        .await;
    assert!(duplicate.is_err());

    // Deactivate
    let deactivated = repo.set_active(user.id, false).await?;
    assert!(!deactivated.is_active);

    Ok(())
}

#[tokio::test]
async fn test_game_crud() -> anyhow::Result<()> {
    let pool = setup_pool().await?;
    let repo = SqliteGameRepository::new(pool.clone());

    let game = repo
        .create(CreateGameRequest {
            name: "Dota 2".to_string(),
            description: Some("MOBA".to_string()),
            image_url: None,
        })
        .await?;
    assert_eq!(repo.find_by_name("Dota 2").await?.map(|g| g.id), Some(game.id));

    // Only the given fields change
    let updated = repo
        .update(
            game.id,
            UpdateGameRequest {
                image_url: Some("https://img.example.com/dota.png".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "Dota 2");
    assert_eq!(updated.description.as_deref(), Some("MOBA"));
    assert_eq!(updated.image_url.as_deref(), Some("https://img.example.com/dota.png"));

    assert_eq!(repo.count_announcements(game.id).await?, 0);

    repo.delete(game.id).await?;
    assert!(repo.find_by_id(game.id).await?.is_none());

    Ok(())
}
