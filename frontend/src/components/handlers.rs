use super::super::{Model, Msg};
use super::utils::{first_image_file, js_error};
use gloo_file::futures::read_as_data_url;
use gloo_file::{Blob, File as GlooFile, ObjectUrl};
use gloo_net::http::Request;
use shared::{ImageRole, RESULT_FILE_NAME, TRY_ON_ENDPOINT, TryOnResponse, GENERIC_UI_ERROR};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{DragEvent, File, FormData, HtmlAnchorElement};
use yew::prelude::*;

pub fn handle_file_selected(model: &mut Model, ctx: &Context<Model>, role: ImageRole, file: File) -> bool {
    let generation = model.slot_mut(role).select(file.clone());

    let link = ctx.link().clone();
    spawn_local(async move {
        let blob = GlooFile::from(file);
        match read_as_data_url(&blob).await {
            Ok(url) => link.send_message(Msg::PreviewReady(role, generation, url)),
            Err(e) => link.send_message(Msg::PreviewFailed(role, e.to_string())),
        }
    });

    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, role: ImageRole, event: DragEvent) -> bool {
    event.prevent_default();
    model.slot_mut(role).is_dragging = false;

    let file = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .and_then(|file_list| first_image_file(&file_list));

    match file {
        Some(file) => handle_file_selected(model, ctx, role, file),
        None => true,
    }
}

pub fn handle_start_processing(model: &mut Model, ctx: &Context<Model>) -> bool {
    if !model.ready_to_process() {
        return false;
    }
    let (Some(person), Some(garment)) = (model.person.file.clone(), model.garment.file.clone()) else {
        return false;
    };

    model.processing = true;
    model.result_url = None;
    model.result_loading = false;
    model.error = None;

    let link = ctx.link().clone();
    spawn_local(async move {
        match send_try_on_request(&person, &garment).await {
            Ok(response) => link.send_message(Msg::ProcessingSucceeded(response)),
            Err(e) => link.send_message(Msg::ProcessingFailed(e)),
        }
    });

    true
}

pub fn handle_processing_succeeded(model: &mut Model, response: TryOnResponse) -> bool {
    log::info!("{}", response.message);
    model.processing = false;
    model.result_url = Some(response.result_image);
    model.result_loading = true;
    true
}

pub fn handle_processing_failed(model: &mut Model, error: String) -> bool {
    log::error!("Try-on request failed: {}", error);
    model.processing = false;
    model.error = Some(GENERIC_UI_ERROR.to_string());
    true
}

/// The result URL could not be displayed; drop it and show the retry prompt.
pub fn handle_result_failed(model: &mut Model) -> bool {
    log::error!("Result image failed to load: {:?}", model.result_url);
    model.result_url = None;
    model.result_loading = false;
    model.error = Some(GENERIC_UI_ERROR.to_string());
    true
}

pub fn handle_download(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(url) = model.result_url.clone() else {
        return false;
    };

    let link = ctx.link().clone();
    spawn_local(async move {
        if let Err(e) = download_image(&url).await {
            link.send_message(Msg::DownloadFailed(e));
        }
    });

    false
}

async fn send_try_on_request(person: &File, garment: &File) -> Result<TryOnResponse, String> {
    let form_data = FormData::new().map_err(js_error)?;
    for (role, file) in [(ImageRole::Person, person), (ImageRole::Garment, garment)] {
        form_data
            .append_with_blob_and_filename(role.as_ref(), file, &file.name())
            .map_err(js_error)?;
    }

    let response = Request::post(TRY_ON_ENDPOINT)
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Server error: {} - {}", status, body));
    }

    response
        .json::<TryOnResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

/// Fetches the result, saves it through a temporary object URL, then revokes the URL.
async fn download_image(url: &str) -> Result<(), String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    if !response.ok() {
        return Err(format!("Server error: {}", response.status()));
    }
    let bytes = response
        .binary()
        .await
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let blob = Blob::new_with_options(bytes.as_slice(), Some("image/png"));
    let object_url = ObjectUrl::from(blob);

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or("no document available")?;
    let body = document.body().ok_or("document has no body")?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| "created element is not an anchor".to_string())?;

    anchor.set_href(&object_url);
    anchor.set_download(RESULT_FILE_NAME);
    body.append_child(&anchor).map_err(js_error)?;
    anchor.click();
    body.remove_child(&anchor).map_err(js_error)?;

    // Dropping the ObjectUrl revokes it.
    drop(object_url);
    Ok(())
}
