use leptos::prelude::*;

use crate::pages::analyzer::AnalyzerPage;

/// Sign-in and the user menu belong to the hosted identity provider; the
/// app only renders the analyzer once the user has reached it.
#[component]
pub fn App() -> impl IntoView {
    view! {
        <div class="app-layout">
            <header class="app-header">
                <a href="/" class="app-title">"Docr.ai"</a>
            </header>
            <main class="content">
                <AnalyzerPage />
            </main>
        </div>
    }
}
