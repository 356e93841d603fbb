use leptos::prelude::*;

use super::{now_ms, BrowserAnalyzer};

/// Notice shown once every analysis in the window has been used.
#[component]
pub fn QuotaBanner(analyzer: RwSignal<BrowserAnalyzer>) -> impl IntoView {
    let limit = move || {
        analyzer.with(|a| {
            let now = now_ms();
            a.limit_reached(now).then(|| a.hours_until_reset(now))
        })
    };

    move || {
        limit().map(|hours| {
            view! {
                <div class="quota-banner">
                    <h3>"Analysis Limit Reached"</h3>
                    <p>
                        {format!(
                            "You've used all your free analyses. Please try again in {} hours.",
                            hours
                        )}
                    </p>
                </div>
            }
        })
    }
}

/// Footer line with the remaining analyses and time to reset.
#[component]
pub fn QuotaStatus(analyzer: RwSignal<BrowserAnalyzer>) -> impl IntoView {
    let status = move || {
        analyzer.with(|a| {
            let now = now_ms();
            format!(
                "Analyses left: {} | Resets in: {} hours",
                a.remaining_analyses(now),
                a.hours_until_reset(now)
            )
        })
    };

    view! { <span class="quota-status">{status}</span> }
}
