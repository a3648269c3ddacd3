pub fn elapsed_to_string(elapsed: chrono::Duration) -> String {
    match elapsed.num_milliseconds() {
        ms @ ..=999 => format!("{} ms", ms.max(0)),
        1_000..=59_999 => format!("{:.1} s", elapsed.num_milliseconds() as f64 / 1000.0),
        _ => format!("{}m {:02}s", elapsed.num_minutes(), elapsed.num_seconds() % 60),
    }
}
