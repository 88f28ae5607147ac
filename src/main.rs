#[tokio::main]
async fn main() {
    if let Err(err) = catalog_sync_lib::run().await {
        eprintln!("catalog-sync: {err}");
        std::process::exit(1);
    }
}
