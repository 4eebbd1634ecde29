#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    // Inference and export tasks are spawned on this runtime from the UI thread
    flowchart_studio::run_app()
}
