use clap::Parser;
use coi_serve::logger;
use coi_serve::server::HttpServer;
use coi_serve::server::config::ServerConfig;
use coi_serve::server::shutdown::ShutdownToken;
use log::info;

fn main() -> std::io::Result<()> {
    logger::init();

    let config = ServerConfig::parse();
    info!("Starting static file server with config: {:?}", config);

    let document_root = std::env::current_dir()?;
    let server = HttpServer::bind(&config, document_root)?;
    let shutdown = ShutdownToken::on_interrupt()?;

    println!("HTTP Server listening at port {} ..", server.local_addr().port());

    server.run(&shutdown)
}
