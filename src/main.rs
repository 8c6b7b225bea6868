mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reddit_client::{normalize_subreddit, parse_post_id, RedditClient, RedditOAuth2Config};
use clap::builder::RangedU64ValueParser;
use redscope_core::{
    AppConfig, CommentNumericField, CommentTextField, CoreError, Credentials, ErrorReporter,
    PostNumericField, PostTextField, SortMode, TimeFilter, MAX_BUCKETS,
};
use report::ReportOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use text_analysis::{
    add_sentiment, default_stopwords, write_csv_file, LexiconScorer, SentimentLabel,
    SentimentThresholds,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "redscope",
    version,
    about = "Scrape Reddit posts and comments and summarize them",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./redscope.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a subreddit listing
    Subreddit(SubredditArgs),

    /// Scrape a single post and its comments
    Post(PostArgs),
}

#[derive(Args)]
struct SubredditArgs {
    /// Subreddit name, with or without the r/ prefix
    name: String,

    /// Listing order: hot, new, top or rising
    #[arg(short, long)]
    sort: Option<SortMode>,

    /// Time window for top listings: hour, day, week, month, year or all
    #[arg(short, long)]
    time_filter: Option<TimeFilter>,

    /// Number of posts to fetch
    #[arg(short, long)]
    limit: Option<usize>,

    /// Post field used for sentiment and word counts
    #[arg(long, default_value = "title")]
    text_field: PostTextField,

    /// Rank the posts table by score, num_comments or created_at
    #[arg(long, default_value = "score")]
    sort_by: PostNumericField,

    #[command(flatten)]
    ranking: RankingArgs,

    /// Rows in the top-posts table
    #[arg(long)]
    top: Option<usize>,

    /// Histogram bucket count
    #[arg(long, value_parser = bucket_count_parser())]
    buckets: Option<usize>,

    /// Write the annotated posts to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct PostArgs {
    /// Post URL (reddit.com or redd.it)
    url: String,

    /// Expand at most this many "more comments" stubs
    #[arg(long, conflicts_with = "expand_all")]
    expand_more: Option<usize>,

    /// Expand every "more comments" stub
    #[arg(long)]
    expand_all: bool,

    /// Rows in the top-comments and top-commenters tables
    #[arg(long)]
    top: Option<usize>,

    /// Rank the comments table by score or created_at
    #[arg(long, default_value = "score")]
    sort_by: CommentNumericField,

    #[command(flatten)]
    ranking: RankingArgs,

    /// Histogram bucket count
    #[arg(long, value_parser = bucket_count_parser())]
    buckets: Option<usize>,

    /// Write the post to this CSV file
    #[arg(long)]
    post_csv: Option<PathBuf>,

    /// Write the annotated comments to this CSV file
    #[arg(long)]
    comments_csv: Option<PathBuf>,
}

#[derive(Args)]
struct RankingArgs {
    /// List the lowest values first
    #[arg(long)]
    ascending: bool,

    /// Only list records labelled positive, neutral or negative
    #[arg(long)]
    sentiment: Option<SentimentLabel>,
}

fn bucket_count_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..=MAX_BUCKETS as u64)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("redscope=debug,reddit_client=debug,text_analysis=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Message for the user; pipeline errors get their friendly text.
fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<CoreError>() {
        Some(core_error) => {
            let message = ErrorReporter::new().report_error(core_error);
            match error.chain().next() {
                Some(outer) if outer.downcast_ref::<CoreError>().is_none() => {
                    format!("{}: {}", outer, message)
                }
                _ => message,
            }
        }
        None => {
            tracing::error!("{:#}", error);
            format!("{:#}", error)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = AppConfig::load(cli.config.as_deref())?;
    let credentials = Credentials::from_env().map_err(CoreError::from)?;
    let config = RedditOAuth2Config::from_settings(&credentials, &settings);
    tracing::debug!(user_agent = %config.user_agent, "Loaded credentials");

    match cli.command {
        Commands::Subreddit(args) => scrape_subreddit(args, config, &settings).await,
        Commands::Post(args) => scrape_post(args, config, &settings).await,
    }
}

fn report_options(
    settings: &AppConfig,
    top: Option<usize>,
    buckets: Option<usize>,
    ranking: &RankingArgs,
) -> ReportOptions {
    let stopwords = default_stopwords(&settings.analysis.extra_stopwords);
    ReportOptions::from_settings(&settings.analysis, stopwords)
        .with_top_n(top)
        .with_bucket_count(buckets)
        .with_ascending(ranking.ascending)
        .with_sentiment(ranking.sentiment)
}

async fn scrape_subreddit(
    args: SubredditArgs,
    config: RedditOAuth2Config,
    settings: &AppConfig,
) -> Result<()> {
    let sort = args.sort.unwrap_or(settings.scrape.default_sort);
    let limit = args.limit.unwrap_or(settings.scrape.default_limit);
    let config = config.with_time_filter(
        args.time_filter
            .unwrap_or(settings.scrape.default_time_filter),
    );

    let name = normalize_subreddit(&args.name).map_err(CoreError::from)?;
    tracing::info!(subreddit = %name, %sort, limit, "Starting subreddit scrape");
    let mut client = RedditClient::connect(config).await?;
    let posts = client.fetch_subreddit_posts(&name, sort, limit).await?;

    let annotated = add_sentiment(
        &posts,
        args.text_field,
        &LexiconScorer::new(),
        &SentimentThresholds::from_settings(&settings.analysis),
    );

    if let Some(path) = &args.csv {
        write_csv_file(path, &annotated)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let options = report_options(settings, args.top, args.buckets, &args.ranking);
    print!(
        "{}",
        report::subreddit_report(
            &name,
            sort,
            args.text_field,
            args.sort_by,
            &annotated,
            &options
        )
    );
    Ok(())
}

async fn scrape_post(args: PostArgs, config: RedditOAuth2Config, settings: &AppConfig) -> Result<()> {
    let more_limit = if args.expand_all {
        None
    } else {
        args.expand_more.or(config.more_comments_limit)
    };
    let config = config.with_more_comments_limit(more_limit);

    let post_id = parse_post_id(&args.url).map_err(CoreError::from)?;
    tracing::info!(url = %args.url, %post_id, ?more_limit, "Starting post scrape");
    let mut client = RedditClient::connect(config).await?;
    let (post, comments) = client.fetch_post_comments(&args.url).await?;

    let annotated = add_sentiment(
        &comments,
        CommentTextField::Body,
        &LexiconScorer::new(),
        &SentimentThresholds::from_settings(&settings.analysis),
    );

    if let Some(path) = &args.post_csv {
        write_csv_file(path, std::slice::from_ref(&post))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.comments_csv {
        write_csv_file(path, &annotated)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let options = report_options(settings, args.top, args.buckets, &args.ranking);
    print!(
        "{}",
        report::post_report(&post, &annotated, args.sort_by, &options)
    );
    Ok(())
}
