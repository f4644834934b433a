//! CLI options.

use clap::{Args, Parser};

use crate::database::models::UserId;
use crate::dataset::Proportions;
use crate::recommender::DEFAULT_TOP_N;

pub mod parsers;

#[derive(Parser)]
#[command(version, about)]
pub struct Opts {
    /// Sentry DSN
    #[arg(long, env = "ACCO_RECOMMENDER_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    /// Performance traces sample rate
    #[arg(long, default_value_t = 0.0)]
    pub traces_sample_rate: f32,

    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Searches the hyperparameter grid for the lowest validation error
    Search(SearchOpts),

    /// Trains a single configuration and overwrites the stored top-N recommendations
    Recommend(RecommendOpts),

    /// Serves the precomputed rows as JSON
    Serve(ServeOpts),
}

#[derive(Args)]
pub struct ConnectionOpts {
    /// MongoDB URI, must name the database
    #[arg(short = 'd', long = "database", env = "ACCO_RECOMMENDER_DATABASE_URI")]
    pub database_uri: String,
}

#[derive(Args)]
pub struct SplitOpts {
    /// Training/validation/test split weights
    #[arg(long = "split", default_value = "6:2:2", value_parser = parsers::proportions)]
    pub proportions: Proportions,

    /// Partition and initialization seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args)]
pub struct SearchOpts {
    #[command(flatten)]
    pub connections: ConnectionOpts,

    #[command(flatten)]
    pub split: SplitOpts,

    /// Latent ranks to try
    #[arg(long = "rank", default_values_t = [5_usize, 10, 15, 20], value_parser = parsers::non_zero_usize)]
    pub ranks: Vec<usize>,

    /// Iteration counts to try
    #[arg(long = "iterations", default_values_t = [5_usize, 10, 20], value_parser = parsers::non_zero_usize)]
    pub iterations: Vec<usize>,

    /// Regularization strengths to try
    #[arg(long = "regularization", default_values_t = [0.1, 1.0, 10.0], value_parser = parsers::non_negative_f64)]
    pub regularizations: Vec<f64>,

    /// Target users, may be repeated
    #[arg(long = "user-id")]
    pub user_ids: Vec<UserId>,

    /// Folds the target users' full rating history into the training subset
    #[arg(long)]
    pub include_user_history: bool,
}

#[derive(Args)]
pub struct RecommendOpts {
    #[command(flatten)]
    pub connections: ConnectionOpts,

    #[command(flatten)]
    pub split: SplitOpts,

    /// Latent rank
    #[arg(long, value_parser = parsers::non_zero_usize)]
    pub rank: usize,

    /// Iteration count
    #[arg(long, value_parser = parsers::non_zero_usize)]
    pub iterations: usize,

    /// Regularization strength
    #[arg(long, value_parser = parsers::non_negative_f64)]
    pub regularization: f64,

    /// Recommendations to keep per user
    #[arg(long, default_value_t = DEFAULT_TOP_N, value_parser = parsers::non_zero_usize)]
    pub top_n: usize,

    /// Users to score, may be repeated; all known users when omitted
    #[arg(long = "user-id")]
    pub user_ids: Vec<UserId>,

    /// Folds the target users' full rating history into the training subset
    #[arg(long)]
    pub include_user_history: bool,
}

#[derive(Args)]
pub struct ServeOpts {
    #[command(flatten)]
    pub connections: ConnectionOpts,

    /// Bind host
    #[arg(long, default_value = "::")]
    pub host: String,

    /// Bind port
    #[arg(short, long, default_value_t = 8081)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_opts_ok() {
        Opts::command().debug_assert();
    }
}
