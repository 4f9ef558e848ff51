#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use grocery_admin::{
	auth::{SlackUserId, TokenSecret},
	reqwest::Client,
	slack::{ReqwestSlackApi, SlackApi, SlackError, blocks::View},
	url::Url,
};

fn slack_api(server: &MockServer) -> ReqwestSlackApi {
	let base_url = Url::parse(&server.url("/api/")).expect("Mock Slack URL should parse.");

	ReqwestSlackApi::new(Client::new(), base_url, TokenSecret::new("xoxb-test"))
}

#[tokio::test]
async fn publish_view_posts_the_home_tab_with_the_bot_token() {
	let server = MockServer::start_async().await;
	let publish = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/views.publish")
				.header("authorization", "Bearer xoxb-test")
				.json_body_includes(json!({ "user_id": "U024BE7LH" }).to_string())
				.json_body_includes(json!({ "view": { "type": "home" } }).to_string());
			then.status(200).header("content-type", "application/json").body(r#"{"ok":true}"#);
		})
		.await;
	let user = SlackUserId::new("U024BE7LH").expect("Slack user fixture should be valid.");

	slack_api(&server)
		.publish_view(&user, &View::home(Vec::new()))
		.await
		.expect("Publishing should succeed.");

	publish.assert_async().await;
}

#[tokio::test]
async fn web_api_errors_name_the_method() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/views.open");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"ok":false,"error":"expired_trigger_id"}"#);
		})
		.await;

	let err = slack_api(&server)
		.open_view("trigger-1", &View::modal("Add unit", "grocery_form", Vec::new()))
		.await
		.expect_err("A rejected call must fail.");

	match err {
		SlackError::Api { method, error } => {
			assert_eq!(method, "views.open");
			assert_eq!(error, "expired_trigger_id");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}
