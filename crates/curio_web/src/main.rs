use curio_web::start_server;

#[tokio::main]
async fn main() {
    start_server().await;
}
