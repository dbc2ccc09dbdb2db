mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use serde_json::json;

use common::{get, post, put, test_app};

#[tokio::test]
async fn public_card_is_rendered_from_the_saved_vcard() -> Result<()> {
    let app = test_app();
    post(&app, "/profiles", json!({ "accountId": "acc_1", "profile": { "name": "Jess", "handle": "jess" } })).await?;

    // before anything is saved the card falls back to the handle
    let card = get(&app, "/public/jess/contact.vcf").await?;
    assert_eq!(card.status, StatusCode::OK, "{}", card.text);
    assert!(card.text.contains("FN:jess\r\n"));

    let res = put(
        &app,
        "/vcard?accountId=acc_1",
        json!({ "full_name": "Jess Doe", "company": "Acme, Inc", "email": "jess@acme.dev", "note": "   " }),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["note"], serde_json::Value::Null);

    let stored = get(&app, "/vcard?accountId=acc_1").await?.data();
    assert_eq!(stored["full_name"], "Jess Doe");

    let card = get(&app, "/public/jess/contact.vcf").await?;
    assert_eq!(card.headers[header::CONTENT_TYPE], "text/vcard; charset=utf-8");
    assert_eq!(card.headers[header::CONTENT_DISPOSITION], "attachment; filename=\"jess.vcf\"");
    assert!(card.text.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\n"));
    assert!(card.text.contains("FN:Jess Doe\r\n"));
    assert!(card.text.contains("N:Doe;Jess;;;\r\n"));
    assert!(card.text.contains("ORG:Acme\\, Inc\r\n"));
    assert!(card.text.ends_with("END:VCARD\r\n"));

    let res = put(&app, "/vcard?accountId=acc_1", json!({ "email": "nope" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);

    Ok(())
}

#[tokio::test]
async fn analytics_counts_taps_and_leads() -> Result<()> {
    let app = test_app();
    post(&app, "/profiles", json!({ "accountId": "acc_1", "profile": { "name": "Jess", "handle": "jess" } })).await?;
    let tag = post(&app, "/admin/tags", json!({ "chip_uid": "04:01" })).await?.data();
    post(&app, "/tags/claim?accountId=acc_1", json!({ "code": tag["claim_code"] })).await?;

    for _ in 0..4 {
        assert_eq!(get(&app, "/t/04:01").await?.status, StatusCode::OK);
    }
    let res = post(&app, "/public/jess/leads", json!({ "fields": {} })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);

    let summary = get(&app, "/analytics?accountId=acc_1&days=7").await?;
    assert_eq!(summary.status, StatusCode::OK, "{}", summary.text);
    let summary = summary.data();
    assert_eq!(summary["days"], 7);
    assert_eq!(summary["total_taps"], 4);
    assert_eq!(summary["total_leads"], 1);
    assert_eq!(summary["buckets"].as_array().map(Vec::len), Some(7));
    assert_eq!(summary["buckets"][6]["taps"], 4);
    assert_eq!(summary["conversion_rate"], 0.25);

    let res = get(&app, "/analytics?accountId=acc_1&days=0").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    let res = get(&app, "/analytics?accountId=acc_1&days=91").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);

    Ok(())
}
