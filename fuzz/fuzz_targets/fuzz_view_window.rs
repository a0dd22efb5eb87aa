#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(view) = rain_config::view::parse_view_window(data) {
        let _ = view.is_stale(0.0, 30);
    }
});
