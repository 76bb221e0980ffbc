use super::*;

fn image(len: usize, content_type: &str) -> Upload {
    Upload { bytes: vec![7u8; len], content_type: content_type.to_owned() }
}

// =============================================================================
// Upload::validate_image
// =============================================================================

#[test]
fn validate_image_accepts_png() {
    assert!(image(16, "image/png").validate_image(1024).is_ok());
}

#[test]
fn validate_image_accepts_parameters_and_case() {
    assert!(image(16, "Image/JPEG; charset=binary").validate_image(1024).is_ok());
}

#[test]
fn validate_image_rejects_empty() {
    assert!(matches!(image(0, "image/png").validate_image(1024), Err(StorageError::Empty)));
}

#[test]
fn validate_image_rejects_oversize() {
    let err = image(2048, "image/png").validate_image(1024).unwrap_err();
    assert!(matches!(err, StorageError::TooLarge { size: 2048, max: 1024 }));
}

#[test]
fn validate_image_allows_exact_limit() {
    assert!(image(1024, "image/png").validate_image(1024).is_ok());
}

#[test]
fn validate_image_rejects_non_image() {
    assert!(matches!(
        image(16, "application/pdf").validate_image(1024),
        Err(StorageError::UnsupportedType(_))
    ));
    assert!(matches!(image(16, "image/").validate_image(1024), Err(StorageError::UnsupportedType(_))));
}

#[test]
fn image_extension_maps_known_types() {
    assert_eq!(image_extension("image/png"), Some("png"));
    assert_eq!(image_extension("Image/JPEG; q=1"), Some("jpg"));
    assert_eq!(image_extension("image/webp"), Some("webp"));
    assert_eq!(image_extension("image/svg+xml"), None);
    assert_eq!(image_extension("application/pdf"), None);
}

// =============================================================================
// sanitize_object_path
// =============================================================================

#[test]
fn sanitize_accepts_plain_and_nested_paths() {
    assert_eq!(sanitize_object_path("abc").unwrap(), PathBuf::from("abc"));
    assert_eq!(sanitize_object_path("user/photo").unwrap(), PathBuf::from("user/photo"));
}

#[test]
fn sanitize_rejects_escape_attempts() {
    for bad in ["", "../etc/passwd", "/abs", "a/../../b", "."] {
        assert!(sanitize_object_path(bad).is_err(), "expected rejection for {bad:?}");
    }
}

// =============================================================================
// LocalStore
// =============================================================================

#[tokio::test]
async fn local_store_put_writes_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().to_path_buf(), "/storage/".into());

    let path = store.put(AVATARS_BUCKET, "user-1", b"first".to_vec(), "image/png").await.unwrap();
    assert_eq!(path, "user-1.png");
    store.put(AVATARS_BUCKET, "user-1", b"second".to_vec(), "image/png").await.unwrap();

    let on_disk = tokio::fs::read(dir.path().join("avatars").join("user-1.png")).await.unwrap();
    assert_eq!(on_disk, b"second");
}

#[tokio::test]
async fn local_store_put_under_new_type_replaces_old_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().to_path_buf(), "/storage".into());

    store.put(AVATARS_BUCKET, "user-1", b"png".to_vec(), "image/png").await.unwrap();
    let path = store.put(AVATARS_BUCKET, "user-1", b"jpeg".to_vec(), "image/jpeg").await.unwrap();
    assert_eq!(path, "user-1.jpg");

    let avatars = dir.path().join("avatars");
    assert!(!avatars.join("user-1.png").exists());
    assert_eq!(tokio::fs::read(avatars.join("user-1.jpg")).await.unwrap(), b"jpeg");
}

#[tokio::test]
async fn local_store_unknown_type_is_stored_bare() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().to_path_buf(), "/storage".into());

    let path = store.put(IMAGES_BUCKET, "w1", b"<svg/>".to_vec(), "image/svg+xml").await.unwrap();
    assert_eq!(path, "w1");
    assert!(dir.path().join("images").join("w1").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn local_store_concurrent_puts_of_one_object_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalStore::new(dir.path().to_path_buf(), "/storage".into()));
    let size = 256 * 1024;

    for _ in 0..20 {
        let writers: Vec<_> = (0u8..4)
            .map(|fill| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put(AVATARS_BUCKET, "u1", vec![fill; size], "image/png").await })
            })
            .collect();
        for writer in writers {
            assert_eq!(writer.await.unwrap().unwrap(), "u1.png");
        }

        let on_disk = tokio::fs::read(dir.path().join("avatars").join("u1.png")).await.unwrap();
        assert_eq!(on_disk.len(), size);
        assert!(on_disk.iter().all(|b| *b == on_disk[0]), "object mixes two uploads");
    }

    let mut entries = tokio::fs::read_dir(dir.path().join("avatars")).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    assert_eq!(names, vec!["u1.png".to_owned()]);
}

#[tokio::test]
async fn local_store_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().to_path_buf(), "/storage".into());

    store.put(IMAGES_BUCKET, "w1", b"x".to_vec(), "image/png").await.unwrap();
    store.remove(IMAGES_BUCKET, "w1").await.unwrap();
    store.remove(IMAGES_BUCKET, "w1").await.unwrap();
    assert!(!dir.path().join("images").join("w1.png").exists());
}

#[tokio::test]
async fn local_store_rejects_bad_bucket_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().to_path_buf(), "/storage".into());

    assert!(store.put("../up", "x", vec![1], "image/png").await.is_err());
    assert!(store.put(IMAGES_BUCKET, "../x", vec![1], "image/png").await.is_err());
}

#[test]
fn local_store_public_url_trims_trailing_slash() {
    let store = LocalStore::new(PathBuf::from("/tmp/none"), "/storage/".into());
    assert_eq!(store.public_url(AVATARS_BUCKET, "u1"), "/storage/avatars/u1");
}

#[test]
fn http_store_urls_follow_storage_api_layout() {
    let store = HttpStore::new("https://example.test/storage/v1/".into(), "key".into()).unwrap();
    assert_eq!(store.object_url(IMAGES_BUCKET, "w1"), "https://example.test/storage/v1/object/images/w1");
    assert_eq!(
        store.public_url(IMAGES_BUCKET, "w1"),
        "https://example.test/storage/v1/object/public/images/w1"
    );
}

#[test]
fn local_mount_only_for_path_prefixes() {
    let local = |public_base: &str| StorageConfig {
        backend: StorageBackend::Local { root: PathBuf::from("/srv/objects"), public_base: public_base.into() },
        max_upload_bytes: 10,
    };
    assert_eq!(local("/storage/").local_mount(), Some(("/storage".into(), PathBuf::from("/srv/objects"))));
    assert_eq!(local("https://cdn.example.test").local_mount(), None);
    assert_eq!(local("/").local_mount(), None);

    let http = StorageConfig {
        backend: StorageBackend::Http { base_url: "https://example.test".into(), service_key: "k".into() },
        max_upload_bytes: 10,
    };
    assert_eq!(http.local_mount(), None);
}

// =============================================================================
// StorageConfig::from_env — single test owns the STORAGE_* vars.
// =============================================================================

#[test]
fn storage_config_from_env_variants() {
    unsafe {
        std::env::remove_var("STORAGE_BACKEND");
        std::env::remove_var("STORAGE_DIR");
        std::env::remove_var("STORAGE_PUBLIC_BASE");
        std::env::remove_var("UPLOAD_MAX_BYTES");
        std::env::remove_var("STORAGE_URL");
        std::env::remove_var("STORAGE_KEY");
    }
    let config = StorageConfig::from_env().unwrap();
    assert_eq!(config.max_upload_bytes, DEFAULT_UPLOAD_MAX_BYTES);
    assert_eq!(
        config.backend,
        StorageBackend::Local { root: PathBuf::from(DEFAULT_STORAGE_DIR), public_base: DEFAULT_PUBLIC_BASE.into() }
    );

    unsafe { std::env::set_var("STORAGE_BACKEND", "http") };
    assert!(matches!(StorageConfig::from_env(), Err(StorageError::Config(_))));

    unsafe {
        std::env::set_var("STORAGE_URL", "https://example.test/storage/v1");
        std::env::set_var("STORAGE_KEY", "secret");
        std::env::set_var("UPLOAD_MAX_BYTES", "1000");
    }
    let config = StorageConfig::from_env().unwrap();
    assert_eq!(config.max_upload_bytes, 1000);
    assert!(matches!(config.backend, StorageBackend::Http { .. }));

    unsafe { std::env::set_var("STORAGE_BACKEND", "ftp") };
    assert!(StorageConfig::from_env().is_err());

    unsafe {
        std::env::remove_var("STORAGE_BACKEND");
        std::env::remove_var("STORAGE_URL");
        std::env::remove_var("STORAGE_KEY");
        std::env::remove_var("UPLOAD_MAX_BYTES");
    }
}
