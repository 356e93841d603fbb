//! Analyzer page: upload a document image, transcribe it, read the result.

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::analyzer::{AnalyzerView, Phase};
use crate::commands;
use crate::components::quota_banner::{QuotaBanner, QuotaStatus};
use crate::components::result_panel::ResultPanel;
use crate::components::upload_zone::UploadZone;
use crate::components::{now_ms, BrowserAnalyzer};
use crate::data_url::ImagePayload;
use crate::quota::QuotaPolicy;
use crate::store::{LocalStorageStore, StateStore};

/// The analyzer's phase, notifying readers only when the phase changes.
///
/// The page layout hangs off this so quota refreshes and result updates do
/// not rebuild the result panel.
pub fn phase_memo<S>(analyzer: RwSignal<AnalyzerView<S>>) -> Memo<Phase>
where
    S: StateStore + Send + Sync + 'static,
{
    Memo::new(move |_| analyzer.with(|a| a.phase()))
}

#[component]
pub fn AnalyzerPage() -> impl IntoView {
    let analyzer: RwSignal<BrowserAnalyzer> = RwSignal::new(AnalyzerView::mount(
        LocalStorageStore,
        QuotaPolicy::default(),
        now_ms(),
    ));
    let (notice, set_notice) = signal::<Option<String>>(None);

    let on_select = Callback::new(move |image: ImagePayload| {
        set_notice.set(None);
        if let Some(Err(e)) = analyzer.try_update(|a| a.select_image(image)) {
            set_notice.set(Some(e.to_string()));
        }
    });

    let on_restore = Callback::new(move |_: ()| {
        if let Some(Err(e)) = analyzer.try_update(|a| a.restore_cached_image()) {
            set_notice.set(Some(e.to_string()));
        }
    });

    let on_analyze = move |_| {
        set_notice.set(None);
        match analyzer.try_update(|a| a.begin_submit(now_ms())) {
            Some(Ok(ticket)) => {
                spawn_local(async move {
                    let outcome = commands::analyze_image(ticket.image().as_str()).await;
                    analyzer.update(|a| {
                        a.complete_submit(ticket, outcome);
                    });
                });
            }
            Some(Err(refused)) => set_notice.set(Some(refused.to_string())),
            None => {}
        }
    };

    let on_choose_different = move |_| {
        if let Some(Err(e)) = analyzer.try_update(|a| a.choose_different_image()) {
            set_notice.set(Some(e.to_string()));
        }
    };

    let phase = phase_memo(analyzer);
    let has_cached = Signal::derive(move || analyzer.with(|a| a.cached_image().is_some()));
    let preview = move || analyzer.with(|a| a.image().map(|i| i.as_str().to_string()));
    let can_submit = move || analyzer.with(|a| a.can_submit());

    view! {
        <div class="page analyzer-page">
            <style>{include_str!("analyzer.css")}</style>

            <QuotaBanner analyzer=analyzer />

            {move || notice.get().map(|msg| view! {
                <div class="notice">{msg}</div>
            })}

            {move || match phase.get() {
                Phase::Idle => view! {
                    <UploadZone
                        on_select=on_select
                        on_restore=on_restore
                        has_cached=has_cached
                    />
                }.into_any(),

                _ => view! {
                    <div class="analysis-layout">
                        <div class="image-column">
                            <div class="image-frame">
                                {move || preview().map(|src| view! {
                                    <img src=src class="preview-image" alt="Uploaded image" />
                                })}
                            </div>
                            <button
                                class="btn btn-secondary"
                                disabled=move || phase.get() == Phase::Analyzing
                                on:click=on_choose_different
                            >
                                "Upload a different image"
                            </button>
                        </div>

                        <div class="result-side">
                            <ResultPanel analyzer=analyzer />
                            <button
                                class="btn btn-primary"
                                disabled=move || !can_submit()
                                on:click=on_analyze
                            >
                                {move || if phase.get() == Phase::Analyzing {
                                    "Analyzing..."
                                } else {
                                    "Analyze Image"
                                }}
                            </button>
                        </div>
                    </div>
                }.into_any(),
            }}

            <footer class="page-footer">
                <span>"Powered by Vision AI | "</span>
                <QuotaStatus analyzer=analyzer />
            </footer>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use leptos::reactive::owner::Owner;

    use crate::store::StoreError;

    const T: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct SharedStore(Mutex<HashMap<String, String>>);

    impl StateStore for SharedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.0.lock().unwrap().remove(key);
        }

        fn clear(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    #[test]
    fn test_layout_follows_phase_changes_only() {
        let owner = Owner::new();
        owner.set();

        let analyzer = RwSignal::new(AnalyzerView::mount(
            SharedStore::default(),
            QuotaPolicy::default(),
            T,
        ));
        let phase = phase_memo(analyzer);

        let rebuilds = Arc::new(AtomicUsize::new(0));
        let layout = {
            let rebuilds = rebuilds.clone();
            Memo::new(move |_| {
                rebuilds.fetch_add(1, Ordering::SeqCst);
                phase.get()
            })
        };

        assert_eq!(layout.get(), Phase::Idle);
        assert_eq!(rebuilds.load(Ordering::SeqCst), 1);

        // Analyzer changes that keep the phase.
        analyzer.update(|a| a.refresh_quota(T + 1));
        analyzer.update(|a| a.refresh_quota(T + 2));
        assert_eq!(layout.get(), Phase::Idle);
        assert_eq!(rebuilds.load(Ordering::SeqCst), 1);

        let image = ImagePayload::from_bytes("image/png", &[1, 2, 3]).unwrap();
        analyzer.update(|a| a.select_image(image).unwrap());
        assert_eq!(layout.get(), Phase::Ready);
        assert_eq!(rebuilds.load(Ordering::SeqCst), 2);
    }
}
