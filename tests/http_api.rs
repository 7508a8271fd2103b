// The warp edge: cookie contract, CSRF double-submit, role gating and the
// anti-enumeration error mapping, driven through warp's test harness.

use palisade::api;
use palisade::server::Server;
use palisade::settings::{Http, Log, Settings, Storage, SweeperCfg};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

fn settings() -> Settings {
    Settings {
        http: Http {
            cert_path: "unused".to_string(),
            key_path: "unused".to_string(),
            address: "127.0.0.1:0".to_string(),
        },
        log: Log {
            filter: "info".to_string(),
        },
        storage: Storage {
            backend: "memory".to_string(),
            mysql_dsn: None,
        },
        sweeper: SweeperCfg {
            enabled: false,
            interval_secs: 3600,
        },
    }
}

// The composed filter type cannot be named, so construction lives in a
// macro rather than a helper function.
macro_rules! api {
    () => {{
        let server = Arc::new(Server::try_new(&settings()).await.unwrap());
        api::v1::routes(server).recover(api::v1::recover_error)
    }};
}

fn cookies_from<B>(res: &warp::http::Response<B>) -> HashMap<String, String> {
    res.headers()
        .get_all(warp::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|s| s.split(';').next())
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn register_body(email: &str) -> Value {
    json!({
        "full_name": "Web Client",
        "email": email,
        "password": "a sound passphrase",
    })
}

macro_rules! register {
    ($api:expr, $email:expr) => {{
        let res = warp::test::request()
            .method("POST")
            .path("/register-client")
            .json(&register_body($email))
            .reply($api)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        cookies_from(&res)
    }};
}

#[tokio::test]
async fn registration_sets_the_three_session_cookies() {
    let api = api!();

    let res = warp::test::request()
        .method("POST")
        .path("/register-client")
        .json(&register_body("a@example.com"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let raw: Vec<String> = res
        .headers()
        .get_all(warp::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert_eq!(raw.len(), 3);

    let access = raw.iter().find(|c| c.starts_with("access_token=")).unwrap();
    assert!(access.contains("HttpOnly"));
    let csrf = raw.iter().find(|c| c.starts_with("csrf_token=")).unwrap();
    assert!(!csrf.contains("HttpOnly"));

    // the same email cannot register twice
    let res = warp::test::request()
        .method("POST")
        .path("/register-client")
        .json(&register_body("a@example.com"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_denials_do_not_reveal_which_factor_failed() {
    let api = api!();
    register!(&api, "b@example.com");

    let unknown = warp::test::request()
        .method("POST")
        .path("/login")
        .json(&json!({"email": "nobody@example.com", "password": "a sound passphrase"}))
        .reply(&api)
        .await;
    let wrong_pw = warp::test::request()
        .method("POST")
        .path("/login")
        .json(&json!({"email": "b@example.com", "password": "wrong passphrase"}))
        .reply(&api)
        .await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);

    let body_a: Value = serde_json::from_slice(unknown.body()).unwrap();
    let body_b: Value = serde_json::from_slice(wrong_pw.body()).unwrap();
    assert_eq!(body_a["error"], body_b["error"]);
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer_and_rejects_anonymous() {
    let api = api!();
    let cookies = register!(&api, "c@example.com");
    let access = &cookies["access_token"];

    let via_cookie = warp::test::request()
        .method("GET")
        .path("/me")
        .header("cookie", format!("access_token={access}"))
        .reply(&api)
        .await;
    assert_eq!(via_cookie.status(), StatusCode::OK);

    let via_bearer = warp::test::request()
        .method("GET")
        .path("/me")
        .header("authorization", format!("Bearer {access}"))
        .reply(&api)
        .await;
    assert_eq!(via_bearer.status(), StatusCode::OK);

    let anonymous = warp::test::request()
        .method("GET")
        .path("/me")
        .reply(&api)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = warp::test::request()
        .method("GET")
        .path("/me")
        .header("cookie", "access_token=garbage")
        .reply(&api)
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_mutations_demand_the_double_submit_pair() {
    let api = api!();
    let cookies = register!(&api, "d@example.com");
    let access = &cookies["access_token"];
    let csrf = &cookies["csrf_token"];

    // authenticated but no CSRF token at all
    let missing = warp::test::request()
        .method("POST")
        .path("/sessions/revoke-all")
        .header("cookie", format!("access_token={access}"))
        .reply(&api)
        .await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    // header only, no cookie
    let header_only = warp::test::request()
        .method("POST")
        .path("/sessions/revoke-all")
        .header("cookie", format!("access_token={access}"))
        .header("x-csrf-token", csrf.as_str())
        .reply(&api)
        .await;
    assert_eq!(header_only.status(), StatusCode::FORBIDDEN);

    // cookie and header disagree
    let mismatch = warp::test::request()
        .method("POST")
        .path("/sessions/revoke-all")
        .header(
            "cookie",
            format!("access_token={access}; csrf_token={csrf}"),
        )
        .header("x-csrf-token", "something-else")
        .reply(&api)
        .await;
    assert_eq!(mismatch.status(), StatusCode::FORBIDDEN);

    // matching pair passes
    let ok = warp::test::request()
        .method("POST")
        .path("/sessions/revoke-all")
        .header(
            "cookie",
            format!("access_token={access}; csrf_token={csrf}"),
        )
        .header("x-csrf-token", csrf.as_str())
        .reply(&api)
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(ok.body()).unwrap();
    assert_eq!(body["data"]["revoked"], json!(1));
}

#[tokio::test]
async fn refresh_rotates_cookies_and_rejects_replay() {
    let api = api!();
    let cookies = register!(&api, "e@example.com");
    let old_refresh = cookies["refresh_token"].clone();

    let renewed = warp::test::request()
        .method("POST")
        .path("/refresh")
        .header("cookie", format!("refresh_token={old_refresh}"))
        .reply(&api)
        .await;
    assert_eq!(renewed.status(), StatusCode::OK);
    let renewed_cookies = cookies_from(&renewed);
    assert_ne!(renewed_cookies["refresh_token"], old_refresh);

    // replaying the consumed cookie fails
    let replay = warp::test::request()
        .method("POST")
        .path("/refresh")
        .header("cookie", format!("refresh_token={old_refresh}"))
        .reply(&api)
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // no cookie at all: denied and stale cookies cleared
    let bare = warp::test::request()
        .method("POST")
        .path("/refresh")
        .reply(&api)
        .await;
    assert_eq!(bare.status(), StatusCode::UNAUTHORIZED);
    let cleared: Vec<&str> = bare
        .headers()
        .get_all(warp::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert_eq!(cleared.len(), 3);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn logout_clears_cookies_and_ends_the_session() {
    let api = api!();
    let cookies = register!(&api, "f@example.com");
    let refresh = cookies["refresh_token"].clone();

    let res = warp::test::request()
        .method("POST")
        .path("/logout")
        .header("cookie", format!("refresh_token={refresh}"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = res
        .headers()
        .get_all(warp::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|c| c.contains("Max-Age=0"))
        .count();
    assert_eq!(cleared, 3);

    let replay = warp::test::request()
        .method("POST")
        .path("/refresh")
        .header("cookie", format!("refresh_token={refresh}"))
        .reply(&api)
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_registration_is_gated_on_the_admin_role() {
    let api = api!();
    let cookies = register!(&api, "g@example.com");
    let access = &cookies["access_token"];
    let csrf = &cookies["csrf_token"];

    // a CLIENT with a valid CSRF pair still lacks the role
    let res = warp::test::request()
        .method("POST")
        .path("/register-admin")
        .header(
            "cookie",
            format!("access_token={access}; csrf_token={csrf}"),
        )
        .header("x-csrf-token", csrf.as_str())
        .json(&register_body("new-admin@example.com"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
