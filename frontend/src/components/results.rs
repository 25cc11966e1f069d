use super::super::{Model, Msg};
use yew::prelude::*;

pub fn render_result(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(url) = &model.result_url else {
        return html! {};
    };

    html! {
        <div class="results-container">
            <h2>{"Result"}</h2>
            <div class="result-frame">
                {
                    if model.result_loading {
                        html! {
                            <div class="result-loading-overlay">
                                <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                            </div>
                        }
                    } else {
                        html! {}
                    }
                }
                <img
                    id="result-image"
                    src={url.clone()}
                    alt="Processed Image"
                    onload={ctx.link().callback(|_| Msg::ResultLoaded)}
                    onerror={ctx.link().callback(|_| Msg::ResultFailed)}
                />
            </div>
            <button
                class="analyze-btn download-btn"
                onclick={ctx.link().callback(|_| Msg::DownloadResult)}
            >
                <i class="fa-solid fa-download"></i>{" Download Image"}
            </button>
        </div>
    }
}
