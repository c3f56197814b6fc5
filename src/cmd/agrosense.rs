use agrosense::bridge::main::run_bridge;

#[tokio::main]
async fn main() {
    run_bridge().await;
}
