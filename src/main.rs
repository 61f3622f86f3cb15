use std::error::Error;

use clap::Parser;
use fluent_clicks::{
    config::Config,
    streamer::{self, Streamer},
};
use log::info;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let config = Config::parse();
    let tracker = config.tracker()?;
    info!(
        "clustering clicks with epsilon {} and min_samples {}",
        config.epsilon, config.min_samples
    );
    let (requests, write) = streamer::stdio();
    let streamer = Streamer::new(requests, write);
    Streamer::run(streamer, &tracker)
}
