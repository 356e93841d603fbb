use leptos::prelude::*;

use crate::analyzer::Phase;
use crate::export::PrintExporter;

use super::BrowserAnalyzer;

/// Rendered Markdown of the current result, with PDF export.
#[component]
pub fn ResultPanel(analyzer: RwSignal<BrowserAnalyzer>) -> impl IntoView {
    let (export_error, set_export_error) = signal::<Option<String>>(None);

    let is_analyzing = move || analyzer.with(|a| a.phase() == Phase::Analyzing);
    let has_result = move || analyzer.with(|a| a.outcome().is_some());
    let is_failure = move || analyzer.with(|a| a.outcome().is_some_and(|o| o.is_failure()));
    let html = move || analyzer.with(|a| a.rendered_html());

    let on_export = move |_| {
        set_export_error.set(None);
        if let Err(e) = analyzer.with(|a| a.export_pdf(&PrintExporter)) {
            tracing::warn!("PDF export failed: {}", e);
            set_export_error.set(Some(e.to_string()));
        }
    };

    view! {
        <div class="result-column">
            <Show
                when=is_analyzing
                fallback=move || view! {
                    <div
                        class="result-panel"
                        class:result-error=is_failure
                        inner_html=html
                    ></div>
                }
            >
                <div class="result-panel result-loading">
                    <div class="spinner"></div>
                    <span>"Analyzing..."</span>
                </div>
            </Show>

            <button
                class="btn btn-secondary"
                disabled=move || !has_result() || is_analyzing()
                on:click=on_export
            >
                "Export as PDF"
            </button>
            {move || export_error.get().map(|e| view! {
                <p class="export-error">{e}</p>
            })}
        </div>
    }
}
