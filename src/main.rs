#[tokio::main]
async fn main() {
    if let Err(err) = panelprobe::app::run_from_env().await {
        eprintln!("panelprobe: {}", err);
        std::process::exit(1);
    }
}
