//! Reasoning challenges from uploaded images

mod common;

use std::sync::Arc;

use anyhow::Result;
use arc_trainer::arc::render_png;
use arc_trainer::challenge::{ChallengeError, ChallengeService};
use arc_trainer::vision::GridDescriber;
use arc_trainer::Grid;
use arc_trainer_kg::MemoryStore;
use common::{FailingCaptioner, FixedCaptioner};
use tempfile::TempDir;

fn upload(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let grid = Grid::new(vec![vec![2, 2], vec![2, 0]]).unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, render_png(&grid).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn test_challenge_from_uploaded_grid() -> Result<()> {
    let uploads = TempDir::new()?;
    upload(&uploads, "grid.png");
    let store = Arc::new(MemoryStore::new());
    let service = ChallengeService::new(Arc::new(GridDescriber), store.clone(), uploads.path());

    let challenge = service.from_image("grid.png".as_ref()).await?;
    assert_eq!(challenge.caption, "A 2 by 2 grid of coloured cells: red (75%), black (25%)");
    assert_eq!(
        challenge.prompt,
        "Based on the image description 'A 2 by 2 grid of coloured cells: red (75%), black (25%)', generate a logical puzzle."
    );
    assert_eq!(store.challenges().await, vec![challenge]);
    Ok(())
}

#[tokio::test]
async fn test_absolute_path_inside_uploads_is_accepted() -> Result<()> {
    let uploads = TempDir::new()?;
    let path = upload(&uploads, "inside.png");
    let service = ChallengeService::new(
        Arc::new(FixedCaptioner("a small picture")),
        Arc::new(MemoryStore::new()),
        uploads.path(),
    );

    let challenge = service.from_image(&path).await?;
    assert_eq!(challenge.caption, "a small picture");
    Ok(())
}

#[tokio::test]
async fn test_image_outside_uploads_is_rejected() -> Result<()> {
    let uploads = TempDir::new()?;
    let elsewhere = TempDir::new()?;
    let outside = upload(&elsewhere, "secret.png");
    let store = Arc::new(MemoryStore::new());
    let service = ChallengeService::new(Arc::new(GridDescriber), store.clone(), uploads.path());

    let err = service.from_image(&outside).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChallengeError>(),
        Some(ChallengeError::OutsideUploadDir(_))
    ));

    let nested = uploads.path().join("sub");
    std::fs::create_dir(&nested)?;
    let service = ChallengeService::new(Arc::new(GridDescriber), store.clone(), &nested);
    upload(&uploads, "parent.png");
    assert!(service.from_image("../parent.png".as_ref()).await.is_err());

    assert!(store.challenges().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_image_is_an_error() {
    let uploads = TempDir::new().unwrap();
    let service = ChallengeService::new(
        Arc::new(GridDescriber),
        Arc::new(MemoryStore::new()),
        uploads.path(),
    );

    assert!(service.from_image("nothing.png".as_ref()).await.is_err());
}

#[tokio::test]
async fn test_caption_failure_stores_nothing() -> Result<()> {
    let uploads = TempDir::new()?;
    upload(&uploads, "grid.png");
    let store = Arc::new(MemoryStore::new());
    let service = ChallengeService::new(Arc::new(FailingCaptioner), store.clone(), uploads.path());

    assert!(service.from_image("grid.png".as_ref()).await.is_err());
    assert!(store.challenges().await.is_empty());
    Ok(())
}
