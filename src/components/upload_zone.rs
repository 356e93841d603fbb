//! Image picker with drag-and-drop and browse.

use leptos::html::Div;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::data_url::ImagePayload;

#[component]
pub fn UploadZone(
    /// Called with the encoded image once a file has been read
    on_select: Callback<ImagePayload>,
    /// Called when the user asks for the cached last upload
    on_restore: Callback<()>,
    /// Whether a cached last upload exists
    #[prop(into)]
    has_cached: Signal<bool>,
) -> impl IntoView {
    let drop_zone_el = NodeRef::<Div>::new();
    let (is_over, set_is_over) = signal(false);
    let (is_loading, set_is_loading) = signal(false);
    let (read_error, set_read_error) = signal::<Option<String>>(None);
    let file_input_id = "image-upload";

    let load_file = move |file: web_sys::File| {
        set_is_loading.set(true);
        set_read_error.set(None);
        spawn_local(async move {
            match read_file_as_data_url(file).await {
                Ok(image) => on_select.run(image),
                Err(e) => {
                    tracing::error!("Failed to read file: {}", e);
                    set_read_error.set(Some(e));
                }
            }
            set_is_loading.set(false);
        });
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        set_is_over.set(false);

        if let Some(file) = ev
            .data_transfer()
            .and_then(|dt| dt.files())
            .and_then(|files| files.get(0))
        {
            load_file(file);
        }
    };

    let on_input_change = move |ev: web_sys::Event| {
        let file = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));
        if let Some(file) = file {
            load_file(file);
        }
    };

    view! {
        <div
            node_ref=drop_zone_el
            class="drop-zone"
            class:drop-zone-active=move || is_over.get()
            class:drop-zone-loading=move || is_loading.get()
            on:dragover=move |ev: web_sys::DragEvent| {
                ev.prevent_default();
                set_is_over.set(true);
            }
            on:dragleave=move |_| set_is_over.set(false)
            on:drop=on_drop
        >
            <Show
                when=move || is_loading.get()
                fallback=move || view! {
                    <div class="drop-zone-content">
                        <h2 class="drop-main">"What document can I read for you?"</h2>
                        <label for=file_input_id class="btn btn-primary">
                            "Upload an image to analyze"
                        </label>
                        <input
                            type="file"
                            id=file_input_id
                            accept="image/*"
                            style="display: none"
                            on:change=on_input_change
                        />
                        <p class="drop-hint">"or drop it here"</p>
                        {move || has_cached.get().then(|| view! {
                            <button class="btn btn-secondary" on:click=move |_| on_restore.run(())>
                                "Use last uploaded image"
                            </button>
                        })}
                        {move || read_error.get().map(|e| view! {
                            <p class="drop-error">{e}</p>
                        })}
                    </div>
                }
            >
                <div class="drop-zone-loading-content">
                    <div class="spinner"></div>
                    <p>"Loading image..."</p>
                </div>
            </Show>
        </div>
    }
}

/// Read a browser `File` into an image data URL.
async fn read_file_as_data_url(file: web_sys::File) -> Result<ImagePayload, String> {
    use js_sys::{ArrayBuffer, Uint8Array};
    use wasm_bindgen_futures::JsFuture;

    let array_buffer: ArrayBuffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("Failed to read file: {:?}", e))?
        .dyn_into()
        .map_err(|_| "Failed to convert to ArrayBuffer".to_string())?;

    let bytes = Uint8Array::new(&array_buffer).to_vec();
    ImagePayload::from_bytes(&file.type_(), &bytes).map_err(|e| e.to_string())
}
