use std::process;

#[tokio::main]
async fn main() {
    let code = foldpack_cli::run().await;
    if code != 0 {
        process::exit(code);
    }
}
