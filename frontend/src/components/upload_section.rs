use super::super::{Model, Msg};
use super::utils::first_image_file;
use shared::ImageRole;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

struct SlotText {
    input_id: &'static str,
    label: &'static str,
    placeholder: &'static str,
    icon: &'static str,
    preview_alt: &'static str,
}

fn slot_text(role: ImageRole) -> SlotText {
    match role {
        ImageRole::Person => SlotText {
            input_id: "person-upload",
            label: "Upload Your Photo",
            placeholder: "Drag and drop your photo here, or click to select",
            icon: "fa-solid fa-upload",
            preview_alt: "Person preview",
        },
        ImageRole::Garment => SlotText {
            input_id: "garment-upload",
            label: "Upload Garment Image",
            placeholder: "Drag and drop garment image here, or click to select",
            icon: "fa-solid fa-shirt",
            preview_alt: "Garment preview",
        },
    }
}

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();

    html! {
        <div class="upload-section">
            <div class="upload-grid">
                { render_upload_card(model, ctx, ImageRole::Person) }
                { render_upload_card(model, ctx, ImageRole::Garment) }
            </div>
            <div class="button-container">
                <button
                    id="process-button"
                    class="analyze-btn"
                    disabled={!model.ready_to_process()}
                    onclick={link.callback(|_| Msg::StartProcessing)}
                >
                    {
                        if model.processing {
                            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Processing..."}</> }
                        } else {
                            html! { <>{"Start Processing"}</> }
                        }
                    }
                </button>
            </div>
        </div>
    }
}

fn render_upload_card(model: &Model, ctx: &Context<Model>, role: ImageRole) -> Html {
    let text = slot_text(role);
    let slot = model.slot(role);
    let link = ctx.link();

    let handle_change = link.batch_callback(move |e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().and_then(|files| first_image_file(&files));
        input.set_value("");
        file.map(|file| Msg::FileSelected(role, file))
    });

    let handle_drag_over = link.callback(move |e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(role, true)
    });

    let handle_drag_leave = link.callback(move |e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(role, false)
    });

    let handle_drop = link.callback(move |e: DragEvent| Msg::HandleDrop(role, e));

    let input_id = text.input_id;
    let trigger_file_input = Callback::from(move |_: MouseEvent| {
        if let Some(input) = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(input_id))
        {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <div class="upload-card">
            <label for={text.input_id} class="upload-label">{ text.label }</label>
            <div class="upload-frame">
                <input
                    type="file"
                    id={text.input_id}
                    accept="image/*"
                    style="display: none;"
                    onchange={handle_change}
                />
                <div
                    class={classes!("upload-area", slot.is_dragging.then_some("drag-over"))}
                    ondragover={handle_drag_over}
                    ondragleave={handle_drag_leave}
                    ondrop={handle_drop}
                    onclick={trigger_file_input}
                >
                    {
                        if let Some(preview) = &slot.preview {
                            html! { <img class="upload-preview" src={preview.clone()} alt={text.preview_alt} /> }
                        } else if slot.file.is_some() {
                            html! {
                                <div class="loading-preview">
                                    <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                                    <p>{"Loading preview..."}</p>
                                </div>
                            }
                        } else {
                            html! {
                                <div class="upload-placeholder">
                                    <i class={text.icon}></i>
                                    <p>{ text.placeholder }</p>
                                    <p class="file-types">{"Supported formats: JPG, PNG, WEBP, GIF"}</p>
                                </div>
                            }
                        }
                    }
                </div>
                {
                    if slot.file.is_some() {
                        html! {
                            <button
                                class="remove-btn"
                                title="Remove this image"
                                onclick={link.callback(move |e: MouseEvent| {
                                    e.stop_propagation();
                                    Msg::ClearImage(role)
                                })}
                            >
                                <i class="fa-solid fa-times"></i>
                            </button>
                        }
                    } else {
                        html! {}
                    }
                }
            </div>
        </div>
    }
}
