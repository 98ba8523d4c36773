use crate::db::*;
use crate::error::{DatabaseError, Error};
use tempfile::NamedTempFile;

fn sample_video(video_id: &str, bvid: Option<&str>) -> NewVideo {
    NewVideo {
        video_id: video_id.to_string(),
        bvid: bvid.map(str::to_string),
        title: "Test Video".to_string(),
        description: Some("desc".to_string()),
        author_id: "uid-1".to_string(),
        author_name: "uploader".to_string(),
        author_avatar: None,
        duration: None,
        play_count: 5000,
        like_count: 300,
        coin_count: 50,
        favorite_count: 80,
        share_count: 10,
        danmaku_count: 200,
        comment_count: 40,
        source_url: "https://www.bilibili.com/video/BV17x411w7KC".to_string(),
        published_at: Some(1_600_000_000),
    }
}

#[tokio::test]
async fn insert_and_get_by_either_key() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_video(&sample_video("170001", Some("BV17x411w7KC")))
        .await
        .unwrap();
    assert!(id.0 > 0);

    // Natural key
    let video = db.get_video_by_key("170001").await.unwrap().unwrap();
    assert_eq!(video.bvid.as_deref(), Some("BV17x411w7KC"));

    // Alternate key
    let video = db.get_video_by_key("BV17x411w7KC").await.unwrap().unwrap();
    assert_eq!(video.video_id, "170001");
    assert_eq!(video.play_count, 5000);

    assert!(db.get_video_by_key("999999").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn duplicate_natural_key_is_constraint_violation() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.insert_video(&sample_video("170001", None)).await.unwrap();
    let err = db
        .insert_video(&sample_video("170001", Some("BV17x411w7KC")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Database(DatabaseError::ConstraintViolation(_))
    ));

    db.close().await;
}

#[tokio::test]
async fn cover_and_comments_update_row() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let id = db
        .insert_video(&sample_video("170001", Some("BV17x411w7KC")))
        .await
        .unwrap();

    assert!(
        db.get_video_by_key("170001")
            .await
            .unwrap()
            .unwrap()
            .cover_local_path
            .is_none()
    );

    db.set_video_cover(id, "bilibili/170001/cover.jpg")
        .await
        .unwrap();
    db.set_video_comments(id, r#"[{"content":"first"}]"#)
        .await
        .unwrap();

    let video = db.get_video_by_key("170001").await.unwrap().unwrap();
    assert_eq!(
        video.cover_local_path.as_deref(),
        Some("bilibili/170001/cover.jpg")
    );
    assert_eq!(video.comments.as_deref(), Some(r#"[{"content":"first"}]"#));

    db.close().await;
}
