// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Upload and retrieval over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{test_cipher, test_config, TestApp, ENDPOINT};
use dotvault_common_secret::SecretString;
use dotvault_server_cipher::{checksum, EncryptedPayload};
use dotvault_server_db::{ApiKeyRepository, OwnerId};
use serde_json::{json, Value};

fn payload_from(body: &Value) -> EncryptedPayload {
	serde_json::from_value(json!({
		"ciphertext": body["ciphertext"],
		"iv": body["iv"],
		"salt": body["salt"],
		"checksum": body["checksum"],
		"scheme": body["scheme"],
	}))
	.unwrap()
}

#[tokio::test]
async fn upload_then_fetch_round_trips() {
	let app = TestApp::new().await;

	let uploaded = app
		.upload_raw("development", "A=1\nB=2", "correct-horse")
		.await;
	assert_eq!(uploaded.status, StatusCode::CREATED, "{}", uploaded.text);
	assert_eq!(uploaded.body["version"], 1);
	let id = uploaded.body["id"].as_str().unwrap().to_string();

	let fetched = app.retrieve("development").await;
	assert_eq!(fetched.status, StatusCode::OK, "{}", fetched.text);
	assert_eq!(fetched.body["version"], 1);
	assert_eq!(fetched.body["id"], id.as_str());
	assert_eq!(fetched.body["projectId"], app.project_id.to_string());
	assert_eq!(fetched.body["environment"], "development");
	assert_eq!(fetched.body["checksum"], checksum("A=1\nB=2"));
	assert!(!fetched.text.contains("B=2"));

	let payload = payload_from(&fetched.body);
	let plaintext = test_cipher()
		.decrypt(&payload, &SecretString::from("correct-horse"))
		.unwrap();
	assert_eq!(plaintext.as_str(), "A=1\nB=2");
	assert!(test_cipher()
		.decrypt(&payload, &SecretString::from("wrong-horse"))
		.is_err());
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;

	let first = app.retrieve("development").await;
	assert_eq!(first.headers["x-dotvault-source"], "store");
	assert_eq!(first.body["source"], "store");

	let second = app.retrieve("development").await;
	assert_eq!(second.headers["x-dotvault-source"], "cache");
	assert_eq!(second.body["source"], "cache");
	assert_eq!(second.body["ciphertext"], first.body["ciphertext"]);
}

#[tokio::test]
async fn read_after_write_never_sees_cached_prior_version() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;

	app.retrieve("development").await;
	let cached = app.retrieve("development").await;
	assert_eq!(cached.headers["x-dotvault-source"], "cache");
	assert_eq!(cached.body["version"], 1);

	let second = app.upload_raw("development", "A=2", "pw").await;
	assert_eq!(second.body["version"], 2);

	let fetched = app.retrieve("development").await;
	assert_eq!(fetched.body["version"], 2);
	assert_eq!(fetched.body["checksum"], checksum("A=2"));
}

#[tokio::test]
async fn versions_count_up_per_environment() {
	let app = TestApp::new().await;

	for expected in 1..=3 {
		let resp = app.upload_raw("staging", &format!("N={expected}"), "pw").await;
		assert_eq!(resp.body["version"], expected);
	}
	let other = app.upload_raw("production", "N=1", "pw").await;
	assert_eq!(other.body["version"], 1);
}

#[tokio::test]
async fn specific_version_is_read_from_store() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;
	app.upload_raw("development", "A=2", "pw").await;

	let uri = format!(
		"{ENDPOINT}?projectId={}&environment=development&version=1",
		app.project_id
	);
	let first = app.get_authed(&uri).await;
	assert_eq!(first.status, StatusCode::OK);
	assert_eq!(first.body["version"], 1);
	assert_eq!(first.body["checksum"], checksum("A=1"));
	assert_eq!(first.headers["x-dotvault-source"], "store");

	let missing = app
		.get_authed(&format!(
			"{ENDPOINT}?projectId={}&environment=development&version=9",
			app.project_id
		))
		.await;
	assert_eq!(missing.status, StatusCode::NOT_FOUND);

	let zero = app
		.get_authed(&format!(
			"{ENDPOINT}?projectId={}&environment=development&version=0",
			app.project_id
		))
		.await;
	assert_eq!(zero.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_environment_is_not_found() {
	let app = TestApp::new().await;
	let resp = app.retrieve("development").await;
	assert_eq!(resp.status, StatusCode::NOT_FOUND);
	assert_eq!(resp.body["error"], "not_found");
}

#[tokio::test]
async fn pre_encrypted_upload_records_configured_scheme() {
	let app = TestApp::new().await;
	let payload = test_cipher()
		.encrypt("TOKEN=abc", &SecretString::from("client-side"))
		.unwrap();

	let resp = app
		.upload(json!({
			"projectId": app.project_id.to_string(),
			"environment": "development",
			"ciphertext": payload.ciphertext,
			"iv": payload.iv,
			"salt": payload.salt,
			"checksum": payload.checksum,
		}))
		.await;
	assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);

	let fetched = app.retrieve("development").await;
	assert_eq!(fetched.body["ciphertext"], payload.ciphertext.as_str());
	assert_eq!(fetched.body["iv"], payload.iv.as_str());
	assert_eq!(
		fetched.body["scheme"],
		app.state.cipher.scheme().to_string().as_str()
	);
}

#[tokio::test]
async fn mixed_shapes_are_rejected() {
	let app = TestApp::new().await;
	let resp = app
		.upload(json!({
			"projectId": app.project_id.to_string(),
			"environment": "development",
			"content": "A=1",
			"passphrase": "pw",
			"ciphertext": "AAAA",
		}))
		.await;
	assert_eq!(resp.status, StatusCode::BAD_REQUEST);
	assert_eq!(resp.body["error"], "validation_error");

	let after = app.retrieve("development").await;
	assert_eq!(after.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
	let app = TestApp::new().await;
	let project = app.project_id.to_string();

	for body in [
		json!({"projectId": project, "environment": "development"}),
		json!({"projectId": "not-a-uuid", "environment": "development", "content": "A=1", "passphrase": "pw"}),
		json!({"projectId": project, "environment": "has space", "content": "A=1", "passphrase": "pw"}),
		json!({"projectId": project, "environment": "development", "content": "A=1", "passphrase": ""}),
		json!({"projectId": project, "environment": "development", "content": "A=1", "passphrase": "pw", "extra": 1}),
	] {
		let resp = app.upload(body.clone()).await;
		assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{body}");
		assert_eq!(resp.body["error"], "validation_error", "{body}");
	}
}

#[tokio::test]
async fn another_owners_project_looks_missing() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;

	let stranger = OwnerId::generate();
	let (_, stranger_token) = common::create_api_key(&app.pool, &stranger).await;
	let auth = format!("Bearer {stranger_token}");
	let uri = format!(
		"{ENDPOINT}?projectId={}&environment=development",
		app.project_id
	);

	let foreign = app
		.request(Method::GET, &uri, &[("authorization", &auth)], None)
		.await;
	let missing_uri = format!(
		"{ENDPOINT}?projectId={}&environment=development",
		uuid::Uuid::new_v4()
	);
	let missing = app
		.request(Method::GET, &missing_uri, &[("authorization", &auth)], None)
		.await;

	assert_eq!(foreign.status, StatusCode::NOT_FOUND);
	assert_eq!(missing.status, StatusCode::NOT_FOUND);
	assert_eq!(foreign.body, missing.body);

	let write = app
		.request(
			Method::POST,
			ENDPOINT,
			&[("authorization", &auth)],
			Some(json!({
				"projectId": app.project_id.to_string(),
				"environment": "development",
				"content": "A=evil",
				"passphrase": "pw",
			})),
		)
		.await;
	assert_eq!(write.status, StatusCode::NOT_FOUND);
	assert_eq!(app.retrieve("development").await.body["version"], 1);
}

#[tokio::test]
async fn credentials_are_required() {
	let app = TestApp::new().await;
	let uri = format!(
		"{ENDPOINT}?projectId={}&environment=development",
		app.project_id
	);

	let none = app.request(Method::GET, &uri, &[], None).await;
	let unknown = app
		.request(
			Method::GET,
			&uri,
			&[("authorization", "Bearer dv_0000000000000000")],
			None,
		)
		.await;
	let malformed = app
		.request(Method::GET, &uri, &[("x-api-key", "not-a-key")], None)
		.await;

	for resp in [&none, &unknown, &malformed] {
		assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
		assert_eq!(resp.body["error"], "unauthorized");
	}
	assert_eq!(none.body, unknown.body);
	assert_eq!(unknown.body, malformed.body);
}

#[tokio::test]
async fn x_api_key_header_is_accepted() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;
	let uri = format!(
		"{ENDPOINT}?projectId={}&environment=development",
		app.project_id
	);
	let resp = app
		.request(Method::GET, &uri, &[("x-api-key", &app.token)], None)
		.await;
	assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn revoked_keys_are_unauthorized() {
	let app = TestApp::new().await;
	ApiKeyRepository::new(app.pool.clone())
		.revoke_api_key(&app.api_key_id)
		.await
		.unwrap();

	let resp = app.retrieve("development").await;
	assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn concurrent_uploads_get_contiguous_versions() {
	let app = TestApp::new().await;
	let payload = test_cipher()
		.encrypt("A=1", &SecretString::from("pw"))
		.unwrap();
	let body = json!({
		"projectId": app.project_id.to_string(),
		"environment": "development",
		"ciphertext": payload.ciphertext,
		"iv": payload.iv,
		"salt": payload.salt,
		"checksum": payload.checksum,
	});

	let uploads = (0..10).map(|_| app.upload(body.clone()));
	let responses = futures::future::join_all(uploads).await;

	let mut versions: Vec<i64> = responses
		.iter()
		.map(|r| {
			assert_eq!(r.status, StatusCode::CREATED, "{}", r.text);
			r.body["version"].as_i64().unwrap()
		})
		.collect();
	versions.sort_unstable();
	assert_eq!(versions, (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn versions_are_listed_newest_first() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;
	app.upload_raw("development", "A=2", "pw").await;

	let uri = format!(
		"{ENDPOINT}/versions?projectId={}&environment=development",
		app.project_id
	);
	let resp = app.get_authed(&uri).await;
	assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
	let versions = resp.body["versions"].as_array().unwrap();
	assert_eq!(versions.len(), 2);
	assert_eq!(versions[0]["version"], 2);
	assert_eq!(versions[1]["version"], 1);
	assert_eq!(versions[1]["checksum"], checksum("A=1"));
	assert!(versions[0].get("ciphertext").is_none());

	let empty = app
		.get_authed(&format!(
			"{ENDPOINT}/versions?projectId={}&environment=staging",
			app.project_id
		))
		.await;
	assert_eq!(empty.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_side_decrypt() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1\nB=2", "correct-horse").await;
	app.upload_raw("development", "A=3", "correct-horse").await;
	let auth = app.bearer();
	let decrypt = format!("{ENDPOINT}/decrypt");

	let latest = app
		.request(
			Method::POST,
			&decrypt,
			&[("authorization", &auth)],
			Some(json!({
				"projectId": app.project_id.to_string(),
				"environment": "development",
				"passphrase": "correct-horse",
			})),
		)
		.await;
	assert_eq!(latest.status, StatusCode::OK, "{}", latest.text);
	assert_eq!(latest.body["version"], 2);
	assert_eq!(latest.body["content"], "A=3");

	let first = app
		.request(
			Method::POST,
			&decrypt,
			&[("authorization", &auth)],
			Some(json!({
				"projectId": app.project_id.to_string(),
				"environment": "development",
				"version": 1,
				"passphrase": "correct-horse",
			})),
		)
		.await;
	assert_eq!(first.body["content"], "A=1\nB=2");

	let wrong = app
		.request(
			Method::POST,
			&decrypt,
			&[("authorization", &auth)],
			Some(json!({
				"projectId": app.project_id.to_string(),
				"environment": "development",
				"passphrase": "battery-staple",
			})),
		)
		.await;
	assert_eq!(wrong.status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(wrong.body["error"], "decryption_failed");
	assert_eq!(wrong.body["message"], "Decryption failed");
}

#[tokio::test]
async fn metrics_count_uploads_and_reads() {
	let app = TestApp::new().await;
	app.upload_raw("development", "A=1", "pw").await;
	app.retrieve("development").await;
	app.retrieve("development").await;

	let resp = app.request(Method::GET, "/metrics", &[], None).await;
	assert_eq!(resp.status, StatusCode::OK);
	assert!(resp.text.contains(r#"dotvault_uploads_total{shape="raw"} 1"#));
	assert!(resp.text.contains(r#"dotvault_retrievals_total{source="store"} 1"#));
	assert!(resp.text.contains(r#"dotvault_retrievals_total{source="cache"} 1"#));
}

#[tokio::test]
async fn openapi_document_is_served() {
	let app = TestApp::new().await;
	let resp = app.request(Method::GET, "/api/openapi.json", &[], None).await;
	assert_eq!(resp.status, StatusCode::OK);
	assert!(resp.body["paths"].get("/api/v1/env-files").is_some());
}

#[tokio::test]
async fn upload_past_deadline_is_504_and_writes_nothing() {
	let mut config = test_config();
	config.request.timeout_secs = 1;
	config.cipher.memory_kib = 262_144;
	config.cipher.iterations = 16;
	let app = TestApp::with_config(config).await;

	let resp = app
		.upload_raw("development", "A=1\nB=2", "correct-horse")
		.await;
	assert_eq!(resp.status, StatusCode::GATEWAY_TIMEOUT, "{}", resp.text);
	assert_eq!(resp.body["error"], "timeout");

	let stored = app
		.state
		.env_files
		.list_versions(&app.project_id, "development")
		.await
		.unwrap();
	assert!(stored.is_empty());

	let listed = app
		.get_authed(&format!(
			"{ENDPOINT}/versions?projectId={}&environment=development",
			app.project_id
		))
		.await;
	assert_eq!(listed.status, StatusCode::NOT_FOUND);
}
