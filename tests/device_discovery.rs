use actix_web::{App, http::StatusCode, test, web};
use serde_json::Value;
use std::time::Duration;
use wifizen::{
    api::Api,
    config::AppConfig,
    internet_status::{InternetStatus, Speed, StatusAcquisition},
    services::devices::{
        ArpTableSource, DeviceCatalog, DeviceDiscovery, DeviceSource, RouterDevicesSource,
    },
};

type DiscoveryApi = Api<StatusAcquisition, DeviceDiscovery>;

// router API and SNMP agent both point at a closed local port
fn unreachable_discovery() -> DeviceDiscovery {
    let pairs = [
        ("ROUTER_HOST", "127.0.0.1:9"),
        ("ROUTER_API_TIMEOUT_MS", "500"),
        ("SNMP_PORT", "9"),
        ("SNMP_TIMEOUT_MS", "300"),
    ];
    let config = AppConfig::load_from(|key: &str| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("valid test configuration");

    let sources: Vec<Box<dyn DeviceSource>> = vec![
        Box::new(RouterDevicesSource::new(&config.router).expect("router api source")),
        Box::new(ArpTableSource::new(&config.router)),
    ];

    DeviceDiscovery::new(sources, DeviceCatalog::default())
}

async fn get_devices(uri: &str) -> (StatusCode, Value) {
    let api = Api::new(
        StatusAcquisition::new(
            vec![],
            InternetStatus::derived(Speed::default()),
            Duration::ZERO,
        ),
        unreachable_discovery(),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .configure(DiscoveryApi::configure),
    )
    .await;
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;

    (status, body)
}

fn device_ids(body: &Value) -> Vec<&str> {
    body["devices"]
        .as_array()
        .expect("devices array")
        .iter()
        .map(|d| d["id"].as_str().expect("device id"))
        .collect()
}

#[tokio::test]
async fn unreachable_router_serves_ranked_catalog() {
    let (status, body) = get_devices("/devices").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(device_ids(&body), vec!["2", "1", "3", "5", "6", "4"]);
}

#[tokio::test]
async fn limit_applies_to_the_fallback_list() {
    let (status, body) = get_devices("/devices?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(device_ids(&body), vec!["2", "1"]);
}
