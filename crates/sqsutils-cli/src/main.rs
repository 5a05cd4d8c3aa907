mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqsutils::{
    Consumer, ConsumerOptions, FileSink, FormatTemplate, Producer, ProducerOptions, SqsQueue,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
pub async fn main() {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    if let Err(e) = cli.run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "sqsutils")]
#[command(about = "bulk load files into SQS and save queues back to files", long_about = None)]
pub struct Cli {
    /// Queue to operate on; must agree with the command's queue argument
    #[arg(short = 'q', long = "queue", id = "global_queue", global = true)]
    queue: Option<String>,

    /// Use static test credentials against a LocalStack endpoint
    #[arg(long, global = true)]
    local: bool,

    /// SQS endpoint URL override
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    endpoint: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Loads data to the specified queue
    #[command(alias = "l")]
    Load {
        /// File to read, one record per line
        file: PathBuf,

        /// Queue name or URL
        queue: String,

        /// Record template; `%s` is replaced by the line
        #[arg(short, long, default_value = "%s")]
        format: String,

        /// Number of batch senders
        #[arg(long, env = "SQSUTILS_SEND_WORKERS", default_value_t = 64)]
        workers: usize,
    },
    /// Saves documents from queue to file
    #[command(alias = "s")]
    Save {
        /// Queue name or URL
        queue: String,

        /// File to write, truncated if it exists
        file: PathBuf,

        /// Only save (and delete) bodies matching this pattern
        #[arg(short, long)]
        regex: Option<String>,

        /// Number of handling workers
        #[arg(long, env = "SQSUTILS_WORKERS", default_value_t = 100)]
        workers: usize,

        /// Number of concurrent long-polls
        #[arg(long, env = "SQSUTILS_FETCH_THREADS", default_value_t = 30)]
        fetch_threads: usize,

        /// Messages buffered between fetchers and workers
        #[arg(long, default_value_t = 1000)]
        prefetch: usize,

        /// Long-poll wait in seconds (0-20)
        #[arg(long, default_value_t = 1)]
        wait_time: i32,

        /// Visibility timeout in seconds
        #[arg(long, default_value_t = 600)]
        visibility_timeout: i32,

        /// Make unprocessed messages visible again immediately on shutdown
        #[arg(long)]
        release_on_shutdown: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let aws = config::aws_config(self.local, self.endpoint.as_deref()).await;

        match self.command {
            Commands::Load {
                file,
                queue,
                format,
                workers,
            } => {
                let queue = config::pick_queue(&queue, self.queue.as_deref())?;
                let options = ProducerOptions {
                    sender_workers: workers,
                    template: FormatTemplate::parse(&format).context("invalid --format")?,
                    ..Default::default()
                };
                options.validate()?;

                let queue = SqsQueue::resolve(&aws, queue)
                    .await
                    .with_context(|| format!("failed to connect to queue {queue}"))?;
                let producer = Producer::new(Arc::new(queue), options)?;

                let summary = producer
                    .load_file(&file)
                    .await
                    .with_context(|| format!("failed to load {}", file.display()))?;
                println!("sent {} of {} records", summary.sent, summary.read);
            }
            Commands::Save {
                queue,
                file,
                regex,
                workers,
                fetch_threads,
                prefetch,
                wait_time,
                visibility_timeout,
                release_on_shutdown,
            } => {
                let queue = config::pick_queue(&queue, self.queue.as_deref())?;
                let filter = regex
                    .as_deref()
                    .map(regex::Regex::new)
                    .transpose()
                    .context("invalid --regex")?;
                let options = ConsumerOptions {
                    max_workers: workers,
                    fetch_threads,
                    prefetch,
                    wait_time_seconds: wait_time,
                    visibility_timeout_seconds: visibility_timeout,
                    release_on_shutdown,
                    ..ConsumerOptions::for_save()
                };
                options.validate()?;
                let shutdown = config::interrupted()?;

                let queue = SqsQueue::resolve(&aws, queue)
                    .await
                    .with_context(|| format!("failed to connect to queue {queue}"))?;
                let sink = FileSink::create(&file, filter)
                    .await
                    .with_context(|| format!("failed to create {}", file.display()))?;

                let consumer = Consumer::new(Arc::new(queue), Arc::new(sink), options)?;
                let summary = consumer.run_until(shutdown).await?;
                println!(
                    "saved {} messages to {}",
                    summary.accepted,
                    file.display()
                );
            }
        }

        Ok(())
    }
}
