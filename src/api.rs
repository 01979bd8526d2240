use crate::services::{
    devices::{Device, DeviceCatalog, DeviceProvider, RenameDeviceRequest, rank},
    internet_status::StatusProvider,
    metrics::{MetricsCatalog, NetworkMetric},
};
use actix_web::{HttpResponse, Responder, web};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct InternetStatusQuery {
    refresh: Option<String>,
}

impl InternetStatusQuery {
    /// Only the literal `true` bypasses the cache
    pub fn force_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

#[derive(Debug, Deserialize)]
pub struct DevicesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetricsQuery {
    time_range: Option<String>,
}

#[derive(Serialize)]
struct DevicesResponse {
    devices: Vec<Device>,
}

#[derive(Serialize)]
struct MetricsResponse<'a> {
    metrics: &'a [NetworkMetric],
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

pub struct Api<Status, Devices>
where
    Status: StatusProvider,
    Devices: DeviceProvider,
{
    pub status_provider: Status,
    pub device_provider: Devices,
    /// Answers summary, distribution and the acknowledged mutations
    pub catalog: DeviceCatalog,
    pub metrics: MetricsCatalog,
}

impl<Status, Devices> Api<Status, Devices>
where
    Status: StatusProvider + 'static,
    Devices: DeviceProvider + 'static,
{
    pub fn new(status_provider: Status, device_provider: Devices) -> Self {
        Api {
            status_provider,
            device_provider,
            catalog: DeviceCatalog::default(),
            metrics: MetricsCatalog::default(),
        }
    }

    /// Register all dashboard routes
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/internet-status", web::get().to(Self::internet_status))
            .route("/devices", web::get().to(Self::devices))
            .route("/devices/summary", web::get().to(Self::device_summary))
            .route(
                "/devices/distribution",
                web::get().to(Self::device_distribution),
            )
            .route("/devices/{id}", web::put().to(Self::rename_device))
            .route("/devices/{id}", web::delete().to(Self::forget_device))
            .route("/network-metrics", web::get().to(Self::network_metrics))
            .route(
                "/network-metrics/total-usage-summary",
                web::get().to(Self::total_usage_summary),
            )
            .route("/version", web::get().to(Self::version));
    }

    pub async fn internet_status(
        query: web::Query<InternetStatusQuery>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("internet_status() called: {query:?}");

        let status = api
            .status_provider
            .internet_status(query.force_refresh())
            .await;

        HttpResponse::Ok().json(status)
    }

    pub async fn devices(query: web::Query<DevicesQuery>, api: web::Data<Self>) -> impl Responder {
        debug!("devices() called: {query:?}");

        let devices = api.device_provider.devices().await;

        HttpResponse::Ok().json(DevicesResponse {
            devices: rank(devices, query.limit),
        })
    }

    pub async fn device_summary(api: web::Data<Self>) -> impl Responder {
        debug!("device_summary() called");
        HttpResponse::Ok().json(api.catalog.summary())
    }

    pub async fn device_distribution(api: web::Data<Self>) -> impl Responder {
        debug!("device_distribution() called");
        HttpResponse::Ok().json(api.catalog.distribution())
    }

    pub async fn rename_device(
        id: web::Path<String>,
        body: web::Json<RenameDeviceRequest>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("rename_device() called for {id}");

        match api.catalog.rename(&id, &body) {
            Some(message) => {
                info!("{message}");
                HttpResponse::Ok().json(MessageResponse { message })
            }
            None => HttpResponse::NotFound().json(ErrorResponse {
                error: "Device not found or name not provided",
            }),
        }
    }

    pub async fn forget_device(id: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        debug!("forget_device() called for {id}");

        match api.catalog.forget(&id) {
            Some(message) => {
                info!("{message}");
                HttpResponse::Ok().json(MessageResponse { message })
            }
            None => HttpResponse::NotFound().json(ErrorResponse {
                error: "Device not found",
            }),
        }
    }

    pub async fn network_metrics(
        query: web::Query<NetworkMetricsQuery>,
        api: web::Data<Self>,
    ) -> impl Responder {
        // every series is returned regardless of the requested range
        debug!(
            "network_metrics() called with time range {:?}",
            query.time_range
        );

        HttpResponse::Ok().json(MetricsResponse {
            metrics: api.metrics.metrics(),
        })
    }

    pub async fn total_usage_summary(api: web::Data<Self>) -> impl Responder {
        debug!("total_usage_summary() called");
        HttpResponse::Ok().json(api.metrics.total_usage_summary())
    }

    pub async fn version() -> impl Responder {
        debug!("version() called");
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }
}
