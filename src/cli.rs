use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "seo-audit")]
#[command(about = "Audits a web page's niche authority with a generative model")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, score and store an audit for a single URL
    Analyze {
        url: String,

        /// Cancel the audit (fetch, model calls and backoff) after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },
    /// Print a stored report
    Show { id: i64 },
    /// List the most recent reports
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}
