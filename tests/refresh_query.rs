#![cfg(feature = "mock")]

use actix_web::{App, http::StatusCode, test, web};
use serde_json::Value;
use wifizen::{
    api::Api,
    internet_status::{Health, InternetStatus, Speed},
    services::devices::DeviceCatalog,
};

#[mockall_double::double]
use wifizen::internet_status::StatusProvider;
#[mockall_double::double]
use wifizen::services::devices::DeviceProvider;

type MockApi = Api<StatusProvider, DeviceProvider>;

fn status() -> InternetStatus {
    InternetStatus {
        speed: Speed {
            download: 120.0,
            upload: 45.0,
        },
        health: Health::Stable,
    }
}

fn make_api(expect_refresh: bool) -> MockApi {
    let mut status_provider_mock = StatusProvider::default();
    status_provider_mock
        .expect_internet_status()
        .withf(move |force_refresh| *force_refresh == expect_refresh)
        .times(1)
        .returning(|_| Box::pin(async { status() }));

    Api::new(status_provider_mock, DeviceProvider::default())
}

async fn assert_refresh(uri: &str, expect_refresh: bool) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(make_api(expect_refresh)))
            .configure(MockApi::configure),
    )
    .await;
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: InternetStatus = test::read_body_json(resp).await;
    assert_eq!(body, status());
}

#[tokio::test]
async fn refresh_true_forces_acquisition() {
    assert_refresh("/internet-status?refresh=true", true).await;
}

#[tokio::test]
async fn missing_refresh_uses_cache() {
    assert_refresh("/internet-status", false).await;
}

#[tokio::test]
async fn other_refresh_values_use_cache() {
    assert_refresh("/internet-status?refresh=false", false).await;
    assert_refresh("/internet-status?refresh=1", false).await;
    assert_refresh("/internet-status?refresh=TRUE", false).await;
}

#[tokio::test]
async fn discovered_devices_are_ranked_and_limited() {
    let mut device_provider_mock = DeviceProvider::default();
    device_provider_mock
        .expect_devices()
        .times(1)
        .returning(|| Box::pin(async { DeviceCatalog::default().all().to_vec() }));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(Api::new(
                StatusProvider::default(),
                device_provider_mock,
            )))
            .configure(MockApi::configure),
    )
    .await;
    let req = test::TestRequest::get().uri("/devices?limit=3").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let ids: Vec<&str> = body["devices"]
        .as_array()
        .expect("devices array")
        .iter()
        .map(|d| d["id"].as_str().expect("device id"))
        .collect();
    assert_eq!(ids, vec!["2", "1", "3"]);
}
