mod common;

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tokio::time::timeout;

use common::TestServer;
use linket_api::autosave::{AutosaveState, AutosaveStatus, Autosaver, LinkDraft, NavigationGuard, ProfileDraft};
use linket_api::client::{ApiClient, ClientError, ProfileSaver};

const WAIT: Duration = Duration::from_secs(10);

fn saved_since(prev: Option<DateTime<Utc>>) -> impl FnMut(&AutosaveState) -> bool {
    move |s| s.status == AutosaveStatus::Saved && !s.is_dirty && s.last_saved_at != prev
}

#[tokio::test]
async fn client_talks_to_a_live_server() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = ApiClient::new(&server.base_url);

    let health = client.health().await?;
    assert_eq!(health["status"], "ok");

    let handle = client.resolve_handle("acc_9", Some("Jess Doe")).await?;
    assert_eq!(handle.handle.as_deref(), Some("jess-doe"));

    let draft = ProfileDraft::new("Jess", "jess");
    let saved = client.save_profile("acc_9", &draft.to_payload()).await?;
    assert!(saved.profile.is_active);

    let err = client
        .save_profile("acc_9", &ProfileDraft::new("Dup", "JESS").to_payload())
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(code, "CONFLICT");
        }
        other => panic!("expected api error, got {:?}", other),
    }

    client.delete_profile("acc_9", saved.profile.id).await?;
    assert!(client.list_profiles("acc_9").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn autosave_round_trips_through_the_api() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = ApiClient::new(&server.base_url);
    let autosave = Autosaver::spawn(
        ProfileDraft::new("Jess", "jess"),
        ProfileSaver::new(client.clone(), "acc_1"),
        Duration::from_millis(50),
    );

    autosave.update(|draft| {
        let mut link = LinkDraft::new("Site", "jess.dev");
        link.icon = Some("globe".into());
        draft.links.push(link);
    });
    let state = timeout(WAIT, autosave.wait_until(saved_since(None))).await?;

    let draft = autosave.draft();
    let profile_id = draft.id.expect("server assigned an id");
    assert!(draft.is_active);
    assert_eq!(draft.links[0].url, "https://jess.dev");
    assert!(draft.links[0].id.is_some());
    assert_eq!(draft.links[0].icon.as_deref(), Some("globe"));
    assert!(autosave.can_leave());

    // later edits update the same profile
    autosave.update(|draft| draft.name = "Jess Doe".into());
    timeout(WAIT, autosave.wait_until(saved_since(state.last_saved_at))).await?;

    let profiles = client.list_profiles("acc_1").await?;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].profile.id, profile_id);
    assert_eq!(profiles[0].profile.name, "Jess Doe");
    assert_eq!(autosave.draft().links[0].icon.as_deref(), Some("globe"));

    Ok(())
}

#[tokio::test]
async fn failed_autosave_surfaces_the_server_message() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = ApiClient::new(&server.base_url);
    client.save_profile("acc_1", &ProfileDraft::new("Jess", "jess").to_payload()).await?;

    let autosave = Autosaver::spawn(
        ProfileDraft::new("Work", "work"),
        ProfileSaver::new(client.clone(), "acc_1"),
        Duration::from_millis(50),
    );
    autosave.update(|draft| draft.handle = "Jess".into());

    let state = timeout(WAIT, autosave.wait_until(|s| s.status == AutosaveStatus::Error)).await?;
    let message = state.last_error.unwrap_or_default();
    assert!(message.contains("'jess'"), "unexpected message: {}", message);
    assert!(!autosave.can_leave());
    assert_eq!(autosave.draft().handle, "Jess");

    autosave.update(|draft| draft.handle = "work".into());
    autosave.retry();
    timeout(WAIT, autosave.wait_until(saved_since(None))).await?;
    assert!(autosave.can_leave());

    let profiles = client.list_profiles("acc_1").await?;
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles.iter().filter(|p| p.profile.is_active).count(), 1);
    assert!(profiles[0].profile.is_active);

    Ok(())
}
