mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{secured_app, send, token_for};
use linket_api::auth::{ACCESS_ADMIN, ACCESS_USER};

#[tokio::test]
async fn owner_routes_require_a_token() -> Result<()> {
    let app = secured_app();

    let res = send(&app, Method::GET, "/profiles?accountId=acc_1", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", res.text);
    assert_eq!(res.json()["code"], "UNAUTHORIZED");

    let res = send(&app, Method::GET, "/profiles?accountId=acc_1", None, Some("not-a-jwt")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", res.text);

    Ok(())
}

#[tokio::test]
async fn token_is_bound_to_its_account() -> Result<()> {
    let app = secured_app();
    let token = token_for("acc_1", ACCESS_USER);

    let res = send(&app, Method::GET, "/profiles?accountId=acc_1", None, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data(), json!([]));

    let res = send(&app, Method::GET, "/profiles?accountId=acc_2", None, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.text);

    let body = json!({ "accountId": "acc_2", "profile": { "name": "Mallory", "handle": "mallory" } });
    let res = send(&app, Method::POST, "/profiles", Some(body), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.text);

    Ok(())
}

#[tokio::test]
async fn missing_account_id_is_a_bad_request() -> Result<()> {
    let app = secured_app();
    let token = token_for("acc_1", ACCESS_USER);

    let res = send(&app, Method::GET, "/profiles", None, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", res.text);
    Ok(())
}

#[tokio::test]
async fn tag_registration_is_admin_only() -> Result<()> {
    let app = secured_app();
    let body = json!({ "chip_uid": "04:A2:2B:11" });

    let user = token_for("acc_1", ACCESS_USER);
    let res = send(&app, Method::POST, "/admin/tags", Some(body.clone()), Some(&user)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.text);

    let admin = token_for("ops", ACCESS_ADMIN);
    let res = send(&app, Method::POST, "/admin/tags", Some(body), Some(&admin)).await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text);
    assert_eq!(res.data()["chip_uid"], "04:A2:2B:11");
    assert_eq!(res.data()["claim_code"].as_str().map(str::len), Some(8));

    Ok(())
}

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let app = secured_app();

    let res = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["status"], "ok");
    assert_eq!(res.data()["storage"], "memory");

    let res = send(&app, Method::GET, "/public/nobody", None, None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND, "{}", res.text);

    Ok(())
}
