mod common;

use common::*;
use tourney::{
    domain::*,
    error::AppError,
    search::{AnnouncementFilter, GameFilter},
    service::ServiceContext,
};

async fn announce(
    ctx: &ServiceContext,
    organizer: &User,
    game: &Game,
    title: &str,
    content: Option<&str>,
) -> anyhow::Result<Announcement> {
    let mut request = announcement_request(game, title, Schedule::open(), None);
    request.content = content.map(str::to_string);
    Ok(ctx.announcement_service.create(Some(organizer), request).await?)
}

#[tokio::test]
async fn test_text_query_ranks_game_then_title_then_content() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let dota = create_game(&ctx, "Dota 2").await?;
    let chess = create_game(&ctx, "Chess").await?;

    let by_content = announce(&ctx, &organizer, &chess, "Open night", Some("Dota fans welcome")).await?;
    let by_title = announce(&ctx, &organizer, &chess, "DOTA watch party", None).await?;
    let by_game = announce(&ctx, &organizer, &dota, "Weekend Cup", None).await?;
    announce(&ctx, &organizer, &chess, "Blitz", None).await?;

    let filter = AnnouncementFilter {
        q: Some("  dota ".to_string()),
        ..Default::default()
    };
    let (results, count) = ctx.announcement_service.search(&filter, 0, 100).await?;
    let ids: Vec<_> = results.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![by_game.id, by_title.id, by_content.id]);
    assert_eq!(count, 3);

    let filter = AnnouncementFilter {
        game_id: Some(dota.id),
        q: Some("dota".to_string()),
        ..Default::default()
    };
    let (results, count) = ctx.announcement_service.search(&filter, 0, 100).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, by_game.id);
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn test_count_ignores_pagination() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let game = create_game(&ctx, "Dota 2").await?;
    for i in 0..5 {
        announce(&ctx, &organizer, &game, &format!("Cup #{i}"), None).await?;
    }

    let filter = AnnouncementFilter::default();
    let (all, count) = ctx.announcement_service.search(&filter, 0, 100).await?;
    assert_eq!(all.len() as i64, count);
    assert_eq!(count, 5);

    let (page, count) = ctx.announcement_service.search(&filter, 3, 2).await?;
    assert_eq!(page.len(), 2);
    assert_eq!(count, 5);
    assert_eq!(page[0].id, all[3].id);

    let (beyond, count) = ctx.announcement_service.search(&filter, 10, 2).await?;
    assert!(beyond.is_empty());
    assert_eq!(count, 5);

    Ok(())
}

#[tokio::test]
async fn test_equality_filters() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let other = create_user(&ctx, false).await?;
    let game = create_game(&ctx, "Dota 2").await?;
    let mine = announce(&ctx, &organizer, &game, "Mine", None).await?;
    let theirs = announce(&ctx, &other, &game, "Theirs", None).await?;
    ctx.announcement_service
        .update_status(Some(&other), theirs.id, AnnouncementAction::Cancel)
        .await?;

    let (results, _) = ctx
        .announcement_service
        .search(
            &AnnouncementFilter {
                organizer_id: Some(organizer.id),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, mine.id);

    let (results, count) = ctx
        .announcement_service
        .search(
            &AnnouncementFilter {
                status: Some(AnnouncementStatus::Cancelled),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(count, 1);
    assert_eq!(results[0].id, theirs.id);

    Ok(())
}

#[tokio::test]
async fn test_short_query_is_ignored_and_long_query_rejected() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let game = create_game(&ctx, "Dota 2").await?;
    announce(&ctx, &organizer, &game, "Weekend Cup", None).await?;
    announce(&ctx, &organizer, &game, "Spring Open", None).await?;

    let (results, count) = ctx
        .announcement_service
        .search(
            &AnnouncementFilter {
                q: Some(" z ".to_string()),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(results.len(), 2);
    assert_eq!(count, 2);

    let err = ctx
        .announcement_service
        .search(
            &AnnouncementFilter {
                q: Some("x".repeat(101)),
                ..Default::default()
            },
            0,
            10,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_wildcards_match_literally() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let game = create_game(&ctx, "Chess").await?;
    let discount = announce(&ctx, &organizer, &game, "50% off entry", None).await?;
    announce(&ctx, &organizer, &game, "500 club", None).await?;
    let underscored = announce(&ctx, &organizer, &game, "cup_final", None).await?;
    announce(&ctx, &organizer, &game, "cupXfinal", None).await?;

    let search = |q: &str| AnnouncementFilter {
        q: Some(q.to_string()),
        ..Default::default()
    };

    let (results, _) = ctx.announcement_service.search(&search("50%"), 0, 10).await?;
    assert_eq!(results.iter().map(|a| a.id).collect::<Vec<_>>(), vec![discount.id]);

    let (results, _) = ctx.announcement_service.search(&search("p_f"), 0, 10).await?;
    assert_eq!(results.iter().map(|a| a.id).collect::<Vec<_>>(), vec![underscored.id]);

    Ok(())
}

#[tokio::test]
async fn test_game_search() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let admin = create_user(&ctx, true).await?;
    for name in ["Valorant", "Chess", "Dota 2"] {
        ctx.game_service
            .create(
                Some(&admin),
                CreateGameRequest {
                    name: name.to_string(),
                    description: None,
                    image_url: None,
                },
            )
            .await?;
    }

    let (games, count) = ctx.game_service.search(&GameFilter::default(), 0, 10).await?;
    let names: Vec<_> = games.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Chess", "Dota 2", "Valorant"]);
    assert_eq!(count, 3);

    let (games, count) = ctx
        .game_service
        .search(
            &GameFilter {
                q: Some("DOT".to_string()),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(count, 1);
    assert_eq!(games[0].name, "Dota 2");

    let (games, _) = ctx
        .game_service
        .search(
            &GameFilter {
                name: Some("Chess".to_string()),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(games.len(), 1);

    let err = ctx
        .game_service
        .create(
            Some(&admin),
            CreateGameRequest {
                name: "Chess".to_string(),
                description: None,
                image_url: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("already exists")));

    Ok(())
}

#[tokio::test]
async fn test_text_query_folds_non_ascii_case() -> anyhow::Result<()> {
    let ctx = setup().await?;
    let organizer = create_user(&ctx, false).await?;
    let game = create_game(&ctx, "Шахматы").await?;
    let spring = announce(&ctx, &organizer, &game, "ТУРНИР Весна", Some("Призы ЖДУТ")).await?;

    for q in ["турнир", "ТУРНИР", "Весна", "ждут", "шахм"] {
        let filter = AnnouncementFilter {
            q: Some(q.to_string()),
            ..Default::default()
        };
        let (results, count) = ctx.announcement_service.search(&filter, 0, 10).await?;
        assert_eq!(count, 1, "query {q:?}");
        assert_eq!(results[0].id, spring.id);
    }

    // Folded copies follow updates.
    ctx.announcement_service
        .update(
            Some(&organizer),
            spring.id,
            UpdateAnnouncementRequest {
                title: Some("ОСЕННИЙ кубок".to_string()),
                ..Default::default()
            },
        )
        .await?;
    let (_, count) = ctx
        .announcement_service
        .search(
            &AnnouncementFilter {
                q: Some("осенний".to_string()),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(count, 1);

    let (games, count) = ctx
        .game_service
        .search(
            &GameFilter {
                q: Some("ШАХ".to_string()),
                ..Default::default()
            },
            0,
            10,
        )
        .await?;
    assert_eq!(count, 1);
    assert_eq!(games[0].id, game.id);

    Ok(())
}
