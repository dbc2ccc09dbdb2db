mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{active_ids, delete, get, post, profiles, test_app};

async fn save(app: &axum::Router, account: &str, profile: Value) -> Result<common::TestResponse> {
    post(app, "/profiles", json!({ "accountId": account, "profile": profile })).await
}

#[tokio::test]
async fn first_profile_activates_and_explicit_activation_moves_it() -> Result<()> {
    let app = test_app();

    let res = save(
        &app,
        "acc_1",
        json!({ "name": "Jess", "handle": "jess", "links": [{ "title": "Site", "url": "https://jess.dev" }] }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let p1 = res.data();
    assert_eq!(p1["is_active"], true);
    assert_eq!(p1["links"][0]["url"], "https://jess.dev");
    assert_eq!(p1["links"][0]["order_index"], 0);

    let res = save(&app, "acc_1", json!({ "name": "Work", "handle": "jess-work", "active": true })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let p2 = res.data();
    assert_eq!(p2["is_active"], true);

    let all = profiles(&app, "acc_1").await?;
    assert_eq!(all.len(), 2);
    assert_eq!(active_ids(&all), vec![p2["id"].as_str().unwrap().to_string()]);
    assert_eq!(all[0]["id"], p1["id"]);
    assert_eq!(all[0]["is_active"], false);

    Ok(())
}

#[tokio::test]
async fn exactly_one_active_after_any_sequence() -> Result<()> {
    let app = test_app();
    let mut ids = Vec::new();

    for (name, handle) in [("One", "one"), ("Two", "two"), ("Three", "three")] {
        let res = save(&app, "acc_1", json!({ "name": name, "handle": handle })).await?;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        ids.push(res.data()["id"].as_str().unwrap().to_string());
        assert_eq!(active_ids(&profiles(&app, "acc_1").await?).len(), 1);
    }
    // later saves without `active` leave the first one active
    assert_eq!(active_ids(&profiles(&app, "acc_1").await?), vec![ids[0].clone()]);

    let res = post(&app, &format!("/profiles/{}/activate?accountId=acc_1", ids[2]), json!({})).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(active_ids(&profiles(&app, "acc_1").await?), vec![ids[2].clone()]);

    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", ids[0])).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(active_ids(&profiles(&app, "acc_1").await?), vec![ids[2].clone()]);

    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", ids[2])).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(active_ids(&profiles(&app, "acc_1").await?), vec![ids[1].clone()]);

    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", ids[1])).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert!(profiles(&app, "acc_1").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn deleting_the_active_profile_promotes_the_other() -> Result<()> {
    let app = test_app();
    let p1 = save(&app, "acc_1", json!({ "name": "P1", "handle": "p1" })).await?.data();
    let p2 = save(&app, "acc_1", json!({ "name": "P2", "handle": "p2" })).await?.data();
    assert_eq!(p1["is_active"], true);
    assert_eq!(p2["is_active"], false);

    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", p1["id"].as_str().unwrap())).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let all = profiles(&app, "acc_1").await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], p2["id"]);
    assert_eq!(all[0]["is_active"], true);

    // deleting again is a no-op
    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", p1["id"].as_str().unwrap())).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    Ok(())
}

#[tokio::test]
async fn handles_are_normalized_and_unique_per_account() -> Result<()> {
    let app = test_app();

    let res = save(&app, "acc_1", json!({ "name": "Jess", "handle": "  Jess.Doe " })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["handle"], "jess-doe");

    let res = save(&app, "acc_1", json!({ "name": "Again", "handle": "JESS-DOE" })).await?;
    assert_eq!(res.status, StatusCode::CONFLICT, "{}", res.text);
    assert_eq!(res.json()["code"], "CONFLICT");

    // another account may reuse it
    let res = save(&app, "acc_2", json!({ "name": "Other", "handle": "jess-doe" })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let res = save(&app, "acc_1", json!({ "name": "Nope", "handle": "!!!" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    assert!(res.json()["field_errors"]["handle"].is_string());

    Ok(())
}

#[tokio::test]
async fn save_replaces_the_whole_link_set() -> Result<()> {
    let app = test_app();
    let created = save(
        &app,
        "acc_1",
        json!({
            "name": "Jess",
            "handle": "jess",
            "links": [
                { "title": "A", "url": "https://a.dev" },
                { "title": "B", "url": "https://b.dev" },
                { "title": "C", "url": "https://c.dev" }
            ]
        }),
    )
    .await?
    .data();
    let b = created["links"][1].clone();

    let res = save(
        &app,
        "acc_1",
        json!({
            "id": created["id"],
            "name": "Jess",
            "handle": "jess",
            "links": [
                { "id": b["id"], "title": "B", "url": "https://b.dev" },
                { "title": "", "url": "d.dev", "is_active": false }
            ]
        }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let updated = res.data();
    let links = updated["links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["id"], b["id"]);
    assert_eq!(links[0]["order_index"], 0);
    assert_eq!(links[1]["url"], "https://d.dev");
    assert_eq!(links[1]["title"], "https://d.dev");
    assert_eq!(links[1]["order_index"], 1);

    // the public page hides disabled links
    let page = get(&app, "/public/jess").await?;
    assert_eq!(page.status, StatusCode::OK, "{}", page.text);
    assert_eq!(page.data()["links"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn invalid_links_report_per_field_errors() -> Result<()> {
    let app = test_app();
    let res = save(
        &app,
        "acc_1",
        json!({ "name": "Jess", "handle": "jess", "links": [{ "title": "ok", "url": "https://ok.dev" }, { "title": "bad", "url": "" }] }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    let body = res.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["links[1].url"].is_string());
    assert!(profiles(&app, "acc_1").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn foreign_profiles_cannot_be_touched() -> Result<()> {
    let app = test_app();
    let theirs = save(&app, "acc_2", json!({ "name": "Theirs", "handle": "theirs" })).await?.data();

    let res = save(&app, "acc_1", json!({ "id": theirs["id"], "name": "Mine", "handle": "mine" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.text);

    let res = post(
        &app,
        &format!("/profiles/{}/activate?accountId=acc_1", theirs["id"].as_str().unwrap()),
        json!({}),
    )
    .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.text);

    // delete of someone else's id is a silent no-op
    let res = delete(&app, &format!("/profiles/{}?accountId=acc_1", theirs["id"].as_str().unwrap())).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(profiles(&app, "acc_2").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn public_page_follows_the_account_handle() -> Result<()> {
    let app = test_app();
    save(&app, "acc_1", json!({ "name": "Jess", "handle": "jess", "headline": "Builder" })).await?;
    save(&app, "acc_1", json!({ "name": "Work", "handle": "work" })).await?;

    let res = get(&app, "/account/handle?userId=acc_1").await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["handle"], "jess");

    let page = get(&app, "/public/JESS").await?.data();
    assert_eq!(page["username"], "jess");
    assert_eq!(page["profile"]["name"], "Jess");
    assert_eq!(page["profile"]["headline"], "Builder");

    let page = get(&app, "/public/jess?profile=work").await?.data();
    assert_eq!(page["profile"]["name"], "Work");

    Ok(())
}
