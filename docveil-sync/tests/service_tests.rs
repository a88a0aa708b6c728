//! Typed request dispatch.

mod support;

use docveil_sync::{
    CredentialManager, CryptoService, Request, Response, StaticToken,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use support::bob;

fn service(token: &str) -> CryptoService {
    CryptoService::new(Arc::new(CredentialManager::new(Arc::new(StaticToken::new(
        token,
    )))))
}

async fn logged_in() -> CryptoService {
    let svc = service("token");
    assert_eq!(
        svc.handle(Request::Login).await,
        Response::Auth {
            authenticated: true
        }
    );
    svc
}

fn generate(sheet: &str) -> Request {
    Request::GenerateKey {
        sheet_id: sheet.into(),
    }
}

// ── Auth ──

#[tokio::test]
async fn check_auth_before_and_after_login() {
    let svc = service("token");
    assert_eq!(
        svc.handle(Request::CheckAuth).await,
        Response::Auth {
            authenticated: false
        }
    );
    svc.handle(Request::Login).await;
    assert_eq!(
        svc.handle(Request::CheckAuth).await,
        Response::Auth {
            authenticated: true
        }
    );
}

#[tokio::test]
async fn cell_operations_require_auth() {
    let svc = service("");
    svc.handle(generate("s1")).await;

    let response = svc
        .handle(Request::EncryptCell {
            sheet_id: "s1".into(),
            value: json!("x"),
        })
        .await;
    assert_eq!(
        response,
        Response::Error {
            message: "authentication required".into()
        }
    );
}

// ── Keys and cells ──

#[tokio::test]
async fn cell_roundtrip() {
    let svc = logged_in().await;
    svc.handle(generate("s1")).await;

    let Response::Cell { cell } = svc
        .handle(Request::EncryptCell {
            sheet_id: "s1".into(),
            value: json!({"amount": 42}),
        })
        .await
    else {
        panic!("expected a cell");
    };
    let response = svc
        .handle(Request::DecryptCell {
            sheet_id: "s1".into(),
            cell,
        })
        .await;
    assert_eq!(
        response,
        Response::Value {
            value: json!({"amount": 42})
        }
    );
}

#[tokio::test]
async fn exported_key_imports_elsewhere() {
    let a = logged_in().await;
    let b = logged_in().await;

    let Response::Key { key, .. } = a.handle(generate("s1")).await else {
        panic!("expected a key");
    };
    let response = a
        .handle(Request::ExportKey {
            sheet_id: "s1".into(),
        })
        .await;
    assert_eq!(
        response,
        Response::Key {
            sheet_id: "s1".into(),
            key: key.clone()
        }
    );

    assert_eq!(
        b.handle(Request::ImportKey {
            sheet_id: "s1".into(),
            key
        })
        .await,
        Response::Ok
    );
    let Response::Cell { cell } = a
        .handle(Request::EncryptCell {
            sheet_id: "s1".into(),
            value: json!("shared"),
        })
        .await
    else {
        panic!("expected a cell");
    };
    assert_eq!(
        b.handle(Request::DecryptCell {
            sheet_id: "s1".into(),
            cell
        })
        .await,
        Response::Value {
            value: json!("shared")
        }
    );
}

#[tokio::test]
async fn unknown_sheet_is_an_error_response() {
    let svc = logged_in().await;
    let response = svc
        .handle(Request::ExportKey {
            sheet_id: "nope".into(),
        })
        .await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn malformed_key_import_is_an_error_response() {
    let svc = service("token");
    let response = svc
        .handle(Request::ImportKey {
            sheet_id: "s1".into(),
            key: "c2hvcnQ=".into(),
        })
        .await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn wrap_key_for_member() {
    let svc = service("token");
    let Response::Key { key, .. } = svc.handle(generate("s1")).await else {
        panic!("expected a key");
    };
    let Response::Wrapped { wrapped } = svc
        .handle(Request::WrapKeyFor {
            sheet_id: "s1".into(),
            public_key: bob().public.to_base64().unwrap(),
        })
        .await
    else {
        panic!("expected a wrapped key");
    };

    let unwrapped = docveil_crypto::unwrap_key_base64(&wrapped, &bob().private).unwrap();
    assert_eq!(unwrapped.to_base64(), key);
}

// ── Wire format ──

#[test]
fn requests_are_tagged_by_type() {
    let request: Request =
        serde_json::from_value(json!({"type": "ENCRYPT_CELL", "sheet_id": "s", "value": 1}))
            .unwrap();
    assert_eq!(
        request,
        Request::EncryptCell {
            sheet_id: "s".into(),
            value: json!(1)
        }
    );
    assert_eq!(
        serde_json::to_value(Request::CheckAuth).unwrap(),
        json!({"type": "CHECK_AUTH"})
    );
    assert_eq!(
        serde_json::to_value(Response::Ok).unwrap(),
        json!({"type": "OK"})
    );
}
