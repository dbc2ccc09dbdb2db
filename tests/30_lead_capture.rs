mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::Router;
use serde_json::json;

use common::{delete, get, post, put, test_app};

const SCOPE: &str = "accountId=acc_1&handle=jess";

/// Account `acc_1` published as `jess` with a three-field form.
async fn jess_with_form() -> Result<Router> {
    let app = test_app();
    let res = post(&app, "/profiles", json!({ "accountId": "acc_1", "profile": { "name": "Jess", "handle": "jess" } })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let res = put(
        &app,
        &format!("/lead-form/fields?{}", SCOPE),
        json!([
            { "label": "Name", "type": "text", "required": true },
            { "label": "Email", "type": "email", "required": true },
            { "label": "Message", "type": "textarea", "validation": { "min_length": 5 } }
        ]),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    Ok(app)
}

#[tokio::test]
async fn duplicate_labels_get_distinct_keys() -> Result<()> {
    let app = test_app();
    let res = put(
        &app,
        &format!("/lead-form/fields?{}", SCOPE),
        json!([{ "label": "Email", "type": "email" }, { "label": "Email", "type": "email" }, { "label": "Full Name!" }]),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let keys: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["email", "email_1", "full_name"]);

    let res = delete(&app, &format!("/lead-form/fields/email_1?{}", SCOPE)).await?;
    assert_eq!(res.data()["deleted"], true);
    let res = delete(&app, &format!("/lead-form/fields/missing?{}", SCOPE)).await?;
    assert_eq!(res.data()["deleted"], false);

    let res = get(&app, &format!("/lead-form/fields?{}", SCOPE)).await?;
    assert_eq!(res.data().as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn select_fields_need_options() -> Result<()> {
    let app = test_app();
    let res = put(&app, &format!("/lead-form/fields?{}", SCOPE), json!([{ "label": "Plan", "type": "select" }])).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    assert!(res.json()["field_errors"]["fields[0].options"].is_string());
    Ok(())
}

#[tokio::test]
async fn submission_flows_into_the_lead_list() -> Result<()> {
    let app = jess_with_form().await?;

    let form = get(&app, "/public/jess/form").await?;
    assert_eq!(form.status, StatusCode::OK, "{}", form.text);
    assert_eq!(form.data()["fields"].as_array().map(Vec::len), Some(3));
    assert_eq!(form.data()["settings"]["submit_label"], "Send");

    let res = post(
        &app,
        "/public/jess/leads",
        json!({
            "fields": { "name": "Ana, Inc", "email": "ana@example.com", "message": "Hello there" },
            "source_url": "https://linket.app/jess"
        }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["accepted"], true);

    let leads = get(&app, "/leads?accountId=acc_1").await?.data();
    let leads = leads.as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["name"], "Ana, Inc");
    assert_eq!(leads[0]["email"], "ana@example.com");
    assert_eq!(leads[0]["message"], "Hello there");
    assert_eq!(leads[0]["custom_fields"]["email"], "ana@example.com");

    let csv = get(&app, "/leads/export?accountId=acc_1").await?;
    assert_eq!(csv.status, StatusCode::OK);
    assert_eq!(csv.headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let mut lines = csv.text.split("\r\n");
    assert_eq!(
        lines.next(),
        Some("created_at,handle,name,email,phone,company,message,source_url,custom_fields")
    );
    assert!(lines.next().unwrap().contains(",jess,\"Ana, Inc\",ana@example.com,"));

    Ok(())
}

#[tokio::test]
async fn invalid_submissions_are_rejected_per_field() -> Result<()> {
    let app = jess_with_form().await?;

    let res = post(
        &app,
        "/public/jess/leads",
        json!({ "fields": { "email": "not-an-email", "message": "hi" } }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    let errors = &res.json()["field_errors"];
    assert!(errors["name"].is_string());
    assert!(errors["email"].is_string());
    assert!(errors["message"].is_string());

    let leads = get(&app, "/leads?accountId=acc_1").await?.data();
    assert_eq!(leads.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn honeypot_hits_look_accepted_but_are_dropped() -> Result<()> {
    let app = jess_with_form().await?;

    let res = post(
        &app,
        "/public/jess/leads",
        json!({ "fields": { "name": "Bot", "email": "bot@spam.test" }, "honeypot": "http://spam.test" }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["accepted"], true);

    let leads = get(&app, "/leads?accountId=acc_1").await?.data();
    assert_eq!(leads.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn consent_and_publishing_are_enforced() -> Result<()> {
    let app = jess_with_form().await?;

    let res = put(
        &app,
        &format!("/lead-form/settings?{}", SCOPE),
        json!({ "require_consent": true, "consent_text": "You may contact me", "success_message": "  " }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["success_message"], "Thanks! We'll be in touch.");

    let submission = json!({ "fields": { "name": "Ana", "email": "ana@example.com" } });
    let res = post(&app, "/public/jess/leads", submission.clone()).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    assert!(res.json()["field_errors"]["consent"].is_string());

    let mut consented = submission.clone();
    consented["consent"] = json!(true);
    let res = post(&app, "/public/jess/leads", consented).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let res = put(&app, &format!("/lead-form/settings?{}", SCOPE), json!({ "published": false })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(get(&app, "/public/jess/form").await?.status, StatusCode::NOT_FOUND);

    let res = put(&app, &format!("/lead-form/settings?{}", SCOPE), json!({ "redirect_url": "ftp://x" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);

    Ok(())
}

#[tokio::test]
async fn hidden_fields_never_block_a_submission() -> Result<()> {
    let app = test_app();
    post(&app, "/profiles", json!({ "accountId": "acc_1", "profile": { "name": "Jess", "handle": "jess" } })).await?;
    let res = put(
        &app,
        &format!("/lead-form/fields?{}", SCOPE),
        json!([
            { "label": "Email", "type": "email", "required": true },
            { "label": "Internal", "required": true, "is_hidden": true }
        ]),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let form = get(&app, "/public/jess/form").await?.data();
    let keys: Vec<&str> = form["fields"].as_array().unwrap().iter().map(|f| f["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["email"]);

    let res = post(
        &app,
        "/public/jess/leads",
        json!({ "fields": { "email": "a@b.io", "utm_source": "card", "budget": 500 } }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let leads = get(&app, "/leads?accountId=acc_1").await?.data();
    let custom = &leads[0]["custom_fields"];
    assert_eq!(custom["email"], "a@b.io");
    assert_eq!(custom["utm_source"], "card");
    assert_eq!(custom["budget"], 500);
    assert!(custom.get("internal").is_none());

    Ok(())
}
