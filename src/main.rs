//! Accommodation recommendation engine.

use clap::Parser;

use crate::opts::{Opts, Subcommand};
use crate::prelude::*;

mod database;
mod dataset;
mod error;
mod helpers;
mod math;
mod opts;
mod prelude;
mod recommender;
mod trainer;
mod web;

fn main() -> Result {
    let opts = Opts::parse();
    let _sentry_guard = helpers::tracing::init(opts.sentry_dsn.clone(), opts.traces_sample_rate)?;
    run_subcommand(opts)
}

#[tokio::main]
async fn run_subcommand(opts: Opts) -> Result {
    match opts.subcommand {
        Subcommand::Search(opts) => trainer::run(opts).await,
        Subcommand::Recommend(opts) => recommender::run(opts).await,
        Subcommand::Serve(opts) => web::run(opts).await,
    }
}
