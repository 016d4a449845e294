use super::*;

fn project_draft(name: &str) -> ProjectDraft {
    ProjectDraft {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        cover: None,
        url: Some("https://example.com".to_string()),
    }
}

fn slide_draft(path: &str) -> CarouselImageDraft {
    CarouselImageDraft {
        path: path.to_string(),
        desc: None,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn stores_and_lists_projects_in_insertion_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .insert_project(&project_draft("first"))
        .await
        .expect("first");
    let second = storage
        .insert_project(&project_draft("second"))
        .await
        .expect("second");

    let projects = storage.list_projects().await.expect("list");
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, first);
    assert_eq!(projects[0].name, "first");
    assert_eq!(projects[1].id, second);
    assert_eq!(projects[0].description.as_deref(), Some("first description"));
    assert_eq!(projects[0].cover, None);
}

#[tokio::test]
async fn update_project_overwrites_every_field() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_project(&project_draft("before"))
        .await
        .expect("insert");

    let replacement = ProjectDraft {
        name: "after".to_string(),
        description: None,
        cover: Some("/covers/after.png".to_string()),
        url: None,
    };
    let updated = storage
        .update_project(&id, &replacement)
        .await
        .expect("update");
    assert!(updated);

    let projects = storage.list_projects().await.expect("list");
    assert_eq!(projects[0].name, "after");
    assert_eq!(projects[0].description, None);
    assert_eq!(projects[0].cover.as_deref(), Some("/covers/after.png"));
    assert_eq!(projects[0].url, None);
}

#[tokio::test]
async fn update_missing_project_reports_no_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let updated = storage
        .update_project(&ProjectId("missing".to_string()), &project_draft("x"))
        .await
        .expect("update");
    assert!(!updated);
}

#[tokio::test]
async fn delete_project_removes_row() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_project(&project_draft("doomed"))
        .await
        .expect("insert");

    assert!(storage.delete_project(&id).await.expect("delete"));
    assert!(!storage.delete_project(&id).await.expect("second delete"));
    assert!(storage.list_projects().await.expect("list").is_empty());
}

#[tokio::test]
async fn carousel_images_keep_display_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .insert_carousel_image(&slide_draft("/a.jpg"))
        .await
        .expect("a");
    storage
        .insert_carousel_image(&slide_draft("/b.jpg"))
        .await
        .expect("b");
    storage
        .insert_carousel_image(&CarouselImageDraft {
            path: "/c.jpg".to_string(),
            desc: Some("third".to_string()),
        })
        .await
        .expect("c");

    let slides = storage.list_carousel_images().await.expect("list");
    assert_eq!(slides.len(), 3);
    assert_eq!(slides[0].path, "/a.jpg");
    assert_eq!(slides[1].path, "/b.jpg");
    assert_eq!(slides[2].path, "/c.jpg");
    assert_eq!(slides[2].desc.as_deref(), Some("third"));
    assert!(slides[0].position < slides[1].position);
    assert!(slides[1].position < slides[2].position);
}

#[tokio::test]
async fn updates_and_deletes_carousel_images() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .insert_carousel_image(&slide_draft("/old.jpg"))
        .await
        .expect("insert");

    let updated = storage
        .update_carousel_image(
            &id,
            &CarouselImageDraft {
                path: "/new.jpg".to_string(),
                desc: Some("replacement".to_string()),
            },
        )
        .await
        .expect("update");
    assert!(updated);

    let slides = storage.list_carousel_images().await.expect("list");
    assert_eq!(slides[0].path, "/new.jpg");
    assert_eq!(slides[0].desc.as_deref(), Some("replacement"));

    assert!(storage.delete_carousel_image(&id).await.expect("delete"));
    assert!(storage
        .list_carousel_images()
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("folio_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("folio.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
