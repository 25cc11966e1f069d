mod components;

use components::handlers;
use components::header::{render_footer, render_header};
use components::results::render_result;
use components::upload_section::render_upload_section;
use components::utils::render_error_message;
use shared::{ImageRole, TryOnResponse};
use web_sys::{DragEvent, File};
use yew::prelude::*;

/// One upload widget's state. Person and garment each own a separate slot.
#[derive(Default)]
struct ImageSlot {
    file: Option<File>,
    preview: Option<String>,
    is_dragging: bool,
    // Bumped on every select/clear so a late preview for an old file is dropped.
    generation: u32,
}

impl ImageSlot {
    fn select(&mut self, file: File) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.file = Some(file);
        self.preview = None;
        self.generation
    }

    fn accept_preview(&mut self, generation: u32, preview: String) -> bool {
        if self.generation != generation || self.file.is_none() {
            return false;
        }
        self.preview = Some(preview);
        true
    }

    fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.file = None;
        self.preview = None;
        self.is_dragging = false;
    }
}

enum Msg {
    // Upload widgets
    FileSelected(ImageRole, File),
    PreviewReady(ImageRole, u32, String),
    PreviewFailed(ImageRole, String),
    ClearImage(ImageRole),
    SetDragging(ImageRole, bool),
    HandleDrop(ImageRole, DragEvent),

    // Try-on request
    StartProcessing,
    ProcessingSucceeded(TryOnResponse),
    ProcessingFailed(String),

    // Result
    ResultLoaded,
    ResultFailed,
    DownloadResult,
    DownloadFailed(String),
}

struct Model {
    person: ImageSlot,
    garment: ImageSlot,
    processing: bool,
    result_url: Option<String>,
    result_loading: bool,
    error: Option<String>,
}

impl Model {
    fn slot(&self, role: ImageRole) -> &ImageSlot {
        match role {
            ImageRole::Person => &self.person,
            ImageRole::Garment => &self.garment,
        }
    }

    fn slot_mut(&mut self, role: ImageRole) -> &mut ImageSlot {
        match role {
            ImageRole::Person => &mut self.person,
            ImageRole::Garment => &mut self.garment,
        }
    }

    fn ready_to_process(&self) -> bool {
        self.person.file.is_some() && self.garment.file.is_some() && !self.processing
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            person: ImageSlot::default(),
            garment: ImageSlot::default(),
            processing: false,
            result_url: None,
            result_loading: false,
            error: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(role, file) => handlers::handle_file_selected(self, ctx, role, file),
            Msg::PreviewReady(role, generation, url) => {
                self.slot_mut(role).accept_preview(generation, url)
            }
            Msg::PreviewFailed(role, error) => {
                log::warn!("Preview for {} failed: {}", role, error);
                false
            }
            Msg::ClearImage(role) => {
                self.slot_mut(role).clear();
                true
            }
            Msg::SetDragging(role, is_dragging) => {
                self.slot_mut(role).is_dragging = is_dragging;
                true
            }
            Msg::HandleDrop(role, event) => handlers::handle_drop(self, ctx, role, event),

            Msg::StartProcessing => handlers::handle_start_processing(self, ctx),
            Msg::ProcessingSucceeded(response) => handlers::handle_processing_succeeded(self, response),
            Msg::ProcessingFailed(error) => handlers::handle_processing_failed(self, error),

            Msg::ResultLoaded => {
                self.result_loading = false;
                true
            }
            Msg::ResultFailed => handlers::handle_result_failed(self),
            Msg::DownloadResult => handlers::handle_download(self, ctx),
            Msg::DownloadFailed(error) => {
                log::error!("Download failed: {}", error);
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                    <section class="hero">
                        <h1>{"Try On Clothes Virtually with AI"}</h1>
                        <p class="subtitle">{"Upload your photo and a garment to see how you would look!"}</p>
                    </section>
                    { render_upload_section(self, ctx) }
                    { render_error_message(self) }
                    { render_result(self, ctx) }
                    <div class="privacy-note">
                        <i class="fa-solid fa-shield-halved"></i>
                        <p>{"We respect your privacy. Images are not stored and are deleted after processing."}</p>
                    </div>
                </main>

                { render_footer() }
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
