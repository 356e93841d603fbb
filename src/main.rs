use docr::app::App;

fn main() {
    docr::logging::init();
    leptos::mount::mount_to_body(App);
}
