mod app;

use clap::Parser;

use driftline::{EngineConfig, FishingClient};

#[derive(Parser)]
#[command(name = "driftline")]
#[command(about = "Driftline fishing console client")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "ws://127.0.0.1:8000/ws/fishing/",
        help = "Websocket fishing endpoint"
    )]
    server: String,

    #[arg(
        short,
        long,
        default_value = "http://127.0.0.1:8000/api",
        help = "REST API base URL"
    )]
    api: String,

    #[arg(short, long, help = "Auth token")]
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = EngineConfig::new(&args.server, &args.api, &args.token);

    let (client, events) = FishingClient::start(config.clone());
    app::run(client, events, &config).await
}
