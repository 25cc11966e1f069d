use super::super::Model;
use wasm_bindgen::JsValue;
use web_sys::{File, FileList};
use yew::prelude::*;

/// First image in a file list, if any. Each widget takes a single file.
pub fn first_image_file(file_list: &FileList) -> Option<File> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .find(|file| file.type_().starts_with("image/"))
}

pub fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}
