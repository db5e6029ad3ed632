//! Dashboard JSON API
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/api/devices?q=` | list or search devices |
//! | POST | `/api/devices` | add a device (connectivity test first) |
//! | GET, PATCH, DELETE | `/api/devices/:id` | read, edit, remove |
//! | POST | `/api/devices/:id/{select,ping,toggle,return-to-stream}` | device actions |
//! | POST | `/api/devices/:id/{volume,mode,playlist}` | playback settings |
//! | GET, POST | `/api/devices/:id/content` | uploaded content |
//! | GET, POST | `/api/devices/:id/schedules` | schedule entries |
//! | DELETE | `/api/devices/:id/schedules/:schedule_id` | remove an entry |
//! | GET | `/api/selected`, `/api/summary`, `/api/playlists`, `/api/notifications` | fleet views |
//! | POST | `/api/scan` | scan every device |
//!
//! Failures are `{"error": "..."}` with 400, 404, 405 or 409.

use std::convert::Infallible;

use chrono::Utc;
use device_registry::{
    format_last_seen, Device, DeviceId, DevicePatch, RegistryError, ScheduleRequest, MAX_VOLUME,
};
use scan_orchestrator::{DeviceManager, ScanError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use warp::filters::BoxedFilter;
use warp::http::{Method, StatusCode};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::notifications::NotificationLog;

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared handles every handler gets a clone of
#[derive(Debug, Clone)]
pub struct ApiState {
    pub manager: DeviceManager,
    pub notifications: NotificationLog,
}

/// A device as the dashboard shows it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceView {
    #[serde(flatten)]
    device: Device,
    last_seen_label: String,
    is_selected: bool,
}

impl DeviceView {
    fn new(device: Device, selected: Option<&DeviceId>) -> Self {
        Self {
            last_seen_label: format_last_seen(device.last_seen, Utc::now()),
            is_selected: selected == Some(&device.id),
            device,
        }
    }
}

#[derive(Debug, Serialize)]
struct FleetSummary {
    total: usize,
    online: usize,
    offline: usize,
    selected: Option<DeviceId>,
    scanning: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddDeviceRequest {
    address: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeRequest {
    volume: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeRequest {
    store_mode: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistRequest {
    playlist_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    file_name: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

// ----------------------------------------------------------------------
// Responses
// ----------------------------------------------------------------------

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn json_error(status: StatusCode, error: &str) -> Response {
    json_reply(&ErrorBody { error }, status)
}

fn error_status(err: &ScanError) -> StatusCode {
    match err {
        ScanError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        ScanError::ScanInProgress => StatusCode::CONFLICT,
        ScanError::MissingAddress => StatusCode::BAD_REQUEST,
        ScanError::Registry(err) => match err {
            RegistryError::DeviceNotFound(_)
            | RegistryError::UnknownPlaylist(_)
            | RegistryError::ContentNotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::DuplicateDevice(_) | RegistryError::DeviceOffline(_) => StatusCode::CONFLICT,
            RegistryError::MissingField(_) => StatusCode::BAD_REQUEST,
        },
    }
}

fn error_reply(err: ScanError) -> Response {
    let status = error_status(&err);
    tracing::debug!("API request failed with {}: {}", status, err);
    json_error(status, &err.to_string())
}

fn respond<T: Serialize>(result: Result<T, ScanError>) -> Response {
    match result {
        Ok(value) => json_reply(&value, StatusCode::OK),
        Err(err) => error_reply(err),
    }
}

fn device_reply(state: &ApiState, result: Result<Device, ScanError>) -> Response {
    let selected = state.manager.registry().selected_id();
    respond(result.map(|device| DeviceView::new(device, selected.as_ref())))
}

// ----------------------------------------------------------------------
// Filters
// ----------------------------------------------------------------------

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["authorization", "content-type", "x-client-info", "apikey"])
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Build the full API filter around shared state.
pub fn api_routes(state: ApiState) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    device_routes(state.clone())
        .or(action_routes(state.clone()))
        .unify()
        .or(content_routes(state.clone()))
        .unify()
        .or(fleet_routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(cors())
}

fn device_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "devices")
        .and(warp::get())
        .and(warp::query::<ListQuery>())
        .and(with_state(state.clone()))
        .and_then(list_devices);

    let add = warp::path!("api" / "devices")
        .and(warp::post())
        .and(json_body::<AddDeviceRequest>())
        .and(with_state(state.clone()))
        .and_then(add_device);

    let get = warp::path!("api" / "devices" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_device);

    let patch = warp::path!("api" / "devices" / String)
        .and(warp::patch())
        .and(json_body::<DevicePatch>())
        .and(with_state(state.clone()))
        .and_then(patch_device);

    let delete = warp::path!("api" / "devices" / String)
        .and(warp::delete())
        .and(with_state(state))
        .and_then(delete_device);

    list.or(add)
        .unify()
        .or(get)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn action_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let select = warp::path!("api" / "devices" / String / "select")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(select_device);

    let ping = warp::path!("api" / "devices" / String / "ping")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(ping_device);

    let toggle = warp::path!("api" / "devices" / String / "toggle")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(toggle_playback);

    let volume = warp::path!("api" / "devices" / String / "volume")
        .and(warp::post())
        .and(json_body::<VolumeRequest>())
        .and(with_state(state.clone()))
        .and_then(set_volume);

    let mode = warp::path!("api" / "devices" / String / "mode")
        .and(warp::post())
        .and(json_body::<ModeRequest>())
        .and(with_state(state.clone()))
        .and_then(set_mode);

    let playlist = warp::path!("api" / "devices" / String / "playlist")
        .and(warp::post())
        .and(json_body::<PlaylistRequest>())
        .and(with_state(state.clone()))
        .and_then(play_playlist);

    let return_to_stream = warp::path!("api" / "devices" / String / "return-to-stream")
        .and(warp::post())
        .and(with_state(state))
        .and_then(return_to_stream);

    select
        .or(ping)
        .unify()
        .or(toggle)
        .unify()
        .or(volume)
        .unify()
        .or(mode)
        .unify()
        .or(playlist)
        .unify()
        .or(return_to_stream)
        .unify()
        .boxed()
}

fn content_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let list_content = warp::path!("api" / "devices" / String / "content")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_content);

    let upload = warp::path!("api" / "devices" / String / "content")
        .and(warp::post())
        .and(json_body::<UploadRequest>())
        .and(with_state(state.clone()))
        .and_then(upload_content);

    let list_schedules = warp::path!("api" / "devices" / String / "schedules")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_schedules);

    let schedule = warp::path!("api" / "devices" / String / "schedules")
        .and(warp::post())
        .and(json_body::<ScheduleRequest>())
        .and(with_state(state.clone()))
        .and_then(schedule_content);

    let remove = warp::path!("api" / "devices" / String / "schedules" / String)
        .and(warp::delete())
        .and(with_state(state))
        .and_then(remove_schedule);

    list_content
        .or(upload)
        .unify()
        .or(list_schedules)
        .unify()
        .or(schedule)
        .unify()
        .or(remove)
        .unify()
        .boxed()
}

fn fleet_routes(state: ApiState) -> BoxedFilter<(Response,)> {
    let selected = warp::path!("api" / "selected")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(selected_device);

    let scan = warp::path!("api" / "scan")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(scan_all);

    let summary = warp::path!("api" / "summary")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(fleet_summary);

    let playlists = warp::path!("api" / "playlists")
        .and(warp::get())
        .map(|| json_reply(&device_registry::playlists(), StatusCode::OK));

    let notifications = warp::path!("api" / "notifications")
        .and(warp::get())
        .and(warp::query::<LimitQuery>())
        .and(with_state(state))
        .map(|query: LimitQuery, state: ApiState| {
            json_reply(&state.notifications.recent(query.limit), StatusCode::OK)
        });

    selected
        .or(scan)
        .unify()
        .or(summary)
        .unify()
        .or(playlists)
        .unify()
        .or(notifications)
        .unify()
        .boxed()
}

// ----------------------------------------------------------------------
// Handlers
// ----------------------------------------------------------------------

async fn list_devices(query: ListQuery, state: ApiState) -> Result<Response, Infallible> {
    let registry = state.manager.registry();
    let selected = registry.selected_id();
    let devices: Vec<DeviceView> = registry
        .search(query.q.as_deref().unwrap_or(""))
        .into_iter()
        .map(|device| DeviceView::new(device, selected.as_ref()))
        .collect();
    Ok(json_reply(&devices, StatusCode::OK))
}

async fn add_device(request: AddDeviceRequest, state: ApiState) -> Result<Response, Infallible> {
    let result = state
        .manager
        .add_device(&request.address, request.name.as_deref())
        .await;

    Ok(match result {
        Ok(device) => json_reply(&DeviceView::new(device, None), StatusCode::CREATED),
        Err(err) => error_reply(err),
    })
}

async fn get_device(id: String, state: ApiState) -> Result<Response, Infallible> {
    let id = DeviceId::new(id);
    let result = state
        .manager
        .registry()
        .get(&id)
        .ok_or(ScanError::DeviceNotFound(id));
    Ok(device_reply(&state, result))
}

async fn patch_device(id: String, patch: DevicePatch, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.update_device(&DeviceId::new(id), patch);
    Ok(device_reply(&state, result))
}

async fn delete_device(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.delete_device(&DeviceId::new(id));
    Ok(device_reply(&state, result))
}

async fn select_device(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.select_device(&DeviceId::new(id));
    Ok(device_reply(&state, result))
}

async fn ping_device(id: String, state: ApiState) -> Result<Response, Infallible> {
    Ok(respond(state.manager.ping_one(&DeviceId::new(id)).await))
}

async fn toggle_playback(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.toggle_playback(&DeviceId::new(id));
    Ok(device_reply(&state, result))
}

async fn set_volume(id: String, request: VolumeRequest, state: ApiState) -> Result<Response, Infallible> {
    let volume = request.volume.min(u32::from(MAX_VOLUME)) as u8;
    let result = state.manager.set_volume(&DeviceId::new(id), volume);
    Ok(device_reply(&state, result))
}

async fn set_mode(id: String, request: ModeRequest, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.set_store_mode(&DeviceId::new(id), request.store_mode);
    Ok(device_reply(&state, result))
}

async fn play_playlist(id: String, request: PlaylistRequest, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.play_playlist(&DeviceId::new(id), &request.playlist_id);
    Ok(device_reply(&state, result))
}

async fn return_to_stream(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state.manager.return_to_stream(&DeviceId::new(id));
    Ok(device_reply(&state, result))
}

async fn list_content(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state
        .manager
        .registry()
        .content(&DeviceId::new(id))
        .map_err(ScanError::from);
    Ok(respond(result))
}

async fn upload_content(id: String, request: UploadRequest, state: ApiState) -> Result<Response, Infallible> {
    Ok(match state.manager.upload_content(&DeviceId::new(id), &request.file_name) {
        Ok(content) => json_reply(&content, StatusCode::CREATED),
        Err(err) => error_reply(err),
    })
}

async fn list_schedules(id: String, state: ApiState) -> Result<Response, Infallible> {
    let result = state
        .manager
        .registry()
        .schedules(&DeviceId::new(id))
        .map_err(ScanError::from);
    Ok(respond(result))
}

async fn schedule_content(
    id: String,
    request: ScheduleRequest,
    state: ApiState,
) -> Result<Response, Infallible> {
    Ok(match state.manager.schedule_content(&DeviceId::new(id), request) {
        Ok(entry) => json_reply(&entry, StatusCode::CREATED),
        Err(err) => error_reply(err),
    })
}

async fn remove_schedule(id: String, schedule_id: String, state: ApiState) -> Result<Response, Infallible> {
    Ok(match state.manager.remove_schedule(&DeviceId::new(id), &schedule_id) {
        Ok(true) => json_reply(&serde_json::json!({ "removed": schedule_id }), StatusCode::OK),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Schedule not found"),
        Err(err) => error_reply(err),
    })
}

async fn selected_device(state: ApiState) -> Result<Response, Infallible> {
    let selected = state.manager.registry().selected();
    let id = selected.as_ref().map(|d| d.id.clone());
    let view = selected.map(|device| DeviceView::new(device, id.as_ref()));
    Ok(json_reply(&view, StatusCode::OK))
}

async fn scan_all(state: ApiState) -> Result<Response, Infallible> {
    Ok(respond(state.manager.scan_all().await))
}

async fn fleet_summary(state: ApiState) -> Result<Response, Infallible> {
    let registry = state.manager.registry();
    let (total, online) = registry.counts();
    let summary = FleetSummary {
        total,
        online,
        offline: total - online,
        selected: registry.selected_id(),
        scanning: state.manager.is_scanning(),
    };
    Ok(json_reply(&summary, StatusCode::OK))
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(json_error(StatusCode::NOT_FOUND, "Not found"));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(json_error(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {}", e)));
    }

    if err.find::<warp::reject::InvalidQuery>().is_some() {
        return Ok(json_error(StatusCode::BAD_REQUEST, "Invalid query string"));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(json_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body"));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    tracing::error!("Unhandled API rejection: {:?}", err);
    Ok(json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
}
