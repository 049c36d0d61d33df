pub mod config;
pub mod history;
pub mod reminder;
pub mod session;

/// Print one event or record as a single JSON line.
pub(crate) fn emit<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Build the runtime for the commands that wait on timers or input.
pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
