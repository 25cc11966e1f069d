use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <a href="/" class="brand">
                <i class="fa-solid fa-shirt"></i>
                <span>{" AI Try-On"}</span>
            </a>
        </header>
    }
}

pub fn render_footer() -> Html {
    let year = js_sys::Date::new_0().get_full_year();
    html! {
        <footer class="app-footer">
            <p>{ format!("© {} AI Try-On. All rights reserved.", year) }</p>
        </footer>
    }
}
