use formbricks_loader::{
    Formbricks, FormbricksLoader, HttpAssetLoader, Lifecycle, LoaderConfig, SdkError, SdkSlot,
    SetupArgs, StaticAssetLoader, StubRuntime, StubSdk,
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn with_static_sdk(sdk: Arc<StubSdk>) -> (Formbricks, Arc<StaticAssetLoader>) {
    let slot = SdkSlot::new();
    let assets = Arc::new(StaticAssetLoader::new(sdk, slot.clone()));
    let loader = FormbricksLoader::new(LoaderConfig::default(), assets.clone(), slot);
    (Formbricks::new(loader), assets)
}

#[tokio::test]
async fn queued_calls_replay_after_setup_and_bad_entries_are_skipped() {
    let sdk = Arc::new(StubSdk::new());
    let (formbricks, assets) = with_static_sdk(sdk.clone());

    formbricks.track("x", None).await.unwrap();
    formbricks
        .invoke("doesNotExist", vec![json!(1)])
        .await
        .unwrap();
    formbricks.set_email("a@b.c").await.unwrap();
    assert_eq!(formbricks.loader().pending(), 3);
    assert!(sdk.calls().is_empty());

    formbricks
        .setup(&SetupArgs::new("https://a/", "e"))
        .await
        .unwrap();

    assert_eq!(formbricks.lifecycle(), Lifecycle::Ready);
    assert_eq!(assets.injections().len(), 1);
    assert_eq!(assets.injections()[0].src, "https://a/js/formbricks.umd.cjs");
    let methods: Vec<_> = sdk.calls().into_iter().map(|c| c.method).collect();
    assert_eq!(methods, vec!["setup", "track", "setEmail"]);
}

#[tokio::test]
async fn direct_calls_after_ready_return_sdk_outcome() {
    let sdk = Arc::new(StubSdk::new().rejecting("setLanguage", "unsupported"));
    let (formbricks, _) = with_static_sdk(sdk.clone());
    formbricks
        .setup(&SetupArgs::new("https://a", "e"))
        .await
        .unwrap();

    formbricks.set_user_id("u1").await.unwrap();
    assert_eq!(sdk.calls_to("setUserId"), vec![vec![json!("u1")]]);

    let err = formbricks.set_language("xx").await.unwrap_err();
    assert!(matches!(err, SdkError::Rejected { ref method, .. } if method == "setLanguage"));

    let err = formbricks.invoke("doesNotExist", vec![]).await.unwrap_err();
    assert_eq!(err, SdkError::MissingMethod("doesNotExist".into()));
}

#[tokio::test]
async fn failed_http_load_can_be_retried() {
    let server = MockServer::start();
    let mut missing = server.mock(|when, then| {
        when.method(GET).path("/js/formbricks.umd.cjs");
        then.status(500);
    });

    let slot = SdkSlot::new();
    let assets = HttpAssetLoader::new(Arc::new(StubRuntime), slot.clone()).unwrap();
    let formbricks = Formbricks::new(FormbricksLoader::new(
        LoaderConfig::default(),
        Arc::new(assets),
        slot,
    ));

    formbricks.track("early", None).await.unwrap();
    let setup = SetupArgs::new(server.base_url(), "env1");
    formbricks.setup(&setup).await.unwrap();
    assert_eq!(formbricks.lifecycle(), Lifecycle::Uninitialized);
    assert_eq!(formbricks.loader().pending(), 1);
    missing.assert();
    missing.delete();

    let served = server.mock(|when, then| {
        when.method(GET).path("/js/formbricks.umd.cjs");
        then.status(200).body("window.formbricks = {};");
    });
    formbricks.setup(&setup).await.unwrap();
    assert_eq!(formbricks.lifecycle(), Lifecycle::Ready);
    assert_eq!(formbricks.loader().pending(), 0);
    served.assert();

    let result = formbricks.invoke("logout", Vec::new()).await.unwrap();
    assert_eq!(result, Value::Null);
}
