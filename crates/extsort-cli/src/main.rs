use std::process;

#[tokio::main]
async fn main() {
    process::exit(extsort_cli::run().await);
}
