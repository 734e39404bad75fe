//! CLI binary for email-pdf.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! to `ServiceConfig` / `PdfOpsConfig` and prints results as JSON or paths.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use email_pdf::pdf_ops::{self, PdfObject, PdfOpsConfig, PdfTools, RemotePdf};
use email_pdf::{ApiRequest, EmailPdfService, Orientation, ServiceConfig, StorageConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "email-pdf",
    version,
    about = "Render stored emails to PDF, upload them and post-process PDFs",
    long_about = None,
    after_help = "EXAMPLES:\n  \
        email-pdf serve --addr 0.0.0.0:3000\n  \
        email-pdf render abc123 --database-url postgres://localhost/emails\n  \
        echo '{\"pathParameters\":{\"id\":\"abc123\"}}' | email-pdf invoke\n  \
        email-pdf gutter book.pdf --gutter-offset 12mm\n  \
        email-pdf concat a.pdf b.pdf --output merged.pdf\n  \
        email-pdf download --url https://cdn.example.com/x.pdf --filename x.pdf"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    #[command(flatten)]
    pdf_ops: PdfOpsArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "EMAIL_PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "EMAIL_PDF_QUIET")]
    quiet: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "EMAIL_PDF_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP trigger.
    Serve {
        /// Listen address.
        #[arg(long, env = "EMAIL_PDF_ADDR", default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
    /// Handle one serverless event read from a file or stdin; print the response.
    Invoke {
        /// Event JSON file. Reads stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Render, upload and record the PDF for one email; print the updated record.
    Render {
        /// Email id.
        id: String,
    },
    /// Print the page count of a PDF.
    Pages { input: PathBuf },
    /// Add gutter margins with pdfjam.
    Gutter { input: PathBuf },
    /// Append one blank page with pdflatex.
    BlankPage { input: PathBuf },
    /// Concatenate PDFs with pdftk.
    Concat {
        /// Inputs, passed to pdftk verbatim (handles like `A=a.pdf` allowed).
        #[arg(required = true)]
        inputs: Vec<OsString>,
        /// Write the merged PDF here instead of a work-directory file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Download an uploaded PDF unless an identical copy is already local.
    Download {
        #[arg(long)]
        url: String,
        /// File name inside the work directory.
        #[arg(long)]
        filename: String,
        /// Base64 SHA-256 of the remote file.
        #[arg(long)]
        checksum: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum StorageKind {
    Memory,
    Local,
    S3,
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// PostgreSQL URL. Without it an empty in-memory store is used.
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Pool size for the PostgreSQL store.
    #[arg(long, global = true, env = "EMAIL_PDF_DB_MAX_CONNECTIONS", default_value_t = 5)]
    db_max_connections: u32,

    /// Apply database migrations on first connect.
    #[arg(long, global = true, env = "EMAIL_PDF_RUN_MIGRATIONS")]
    run_migrations: bool,

    /// Object store backend.
    #[arg(long, global = true, env = "EMAIL_PDF_STORAGE", value_enum, default_value = "memory")]
    storage: StorageKind,

    /// Root directory for `--storage local`.
    #[arg(long, global = true, env = "EMAIL_PDF_STORAGE_ROOT", default_value = "./storage")]
    storage_root: PathBuf,

    /// Bucket for `--storage s3`.
    #[arg(long, global = true, env = "EMAIL_PDF_S3_BUCKET")]
    s3_bucket: Option<String>,

    #[arg(long, global = true, env = "EMAIL_PDF_S3_REGION")]
    s3_region: Option<String>,

    /// Custom endpoint for S3-compatible providers.
    #[arg(long, global = true, env = "EMAIL_PDF_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Prefix every storage path is placed under.
    #[arg(long, global = true, env = "EMAIL_PDF_PUBLIC_PATH", default_value = "public")]
    public_path: String,

    /// Base URL uploaded objects are reachable under.
    #[arg(long, global = true, env = "EMAIL_PDF_PUBLIC_URL", default_value = "http://localhost")]
    public_base_url: String,

    /// HTML→PDF engine. Defaults to $LAMBDA_TASK_ROOT/bin/wkhtmltopdf or wkhtmltopdf.
    #[arg(long, global = true, env = "EMAIL_PDF_ENGINE")]
    engine: Option<PathBuf>,

    /// Paper size for rendered emails.
    #[arg(long, global = true, env = "EMAIL_PDF_PAGE_SIZE", default_value = "A4")]
    page_size: String,

    #[arg(long, global = true, env = "EMAIL_PDF_ORIENTATION", default_value = "portrait")]
    orientation: Orientation,

    /// Margin applied to all four sides.
    #[arg(long, global = true, env = "EMAIL_PDF_MARGIN", default_value = "10mm")]
    margin: String,

    /// Render timeout in seconds.
    #[arg(long, global = true, env = "EMAIL_PDF_RENDER_TIMEOUT", default_value_t = 30)]
    render_timeout: u64,
}

#[derive(Args, Debug)]
struct PdfOpsArgs {
    /// Directory for intermediate PDF files. Default: <tmp>/compilation.
    #[arg(long, global = true, env = "EMAIL_PDF_WORK_DIR")]
    work_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "EMAIL_PDF_PAPER_WIDTH", default_value = "148mm")]
    paper_width: String,

    #[arg(long, global = true, env = "EMAIL_PDF_PAPER_HEIGHT", default_value = "210mm")]
    paper_height: String,

    #[arg(long, global = true, env = "EMAIL_PDF_GUTTER_OFFSET", default_value = "10mm")]
    gutter_offset: String,

    #[arg(long, global = true, env = "PDFJAM_PATH", default_value = "pdfjam")]
    pdfjam: PathBuf,

    #[arg(long, global = true, env = "PDFLATEX_PATH", default_value = "pdflatex")]
    pdflatex: PathBuf,

    #[arg(long, global = true, env = "PDFTK_PATH", default_value = "pdftk")]
    pdftk: PathBuf,

    /// LaTeX template for blank-page insertion.
    #[arg(long, global = true, env = "EMAIL_PDF_BLANK_TEMPLATE")]
    blank_template: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "EMAIL_PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal outside development.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    // Post-processing settings are validated by `PdfTools::new`, only in
    // the subcommands that use them.
    let pdf_ops_config = build_pdf_ops_config(&cli.pdf_ops);

    match &cli.command {
        Command::Serve { addr } => {
            let config = build_service_config(&cli.service)?;
            let service = Arc::new(EmailPdfService::from_config(&config)?);
            email_pdf::server::serve(*addr, service)
                .await
                .context("Server failed")?;
        }
        Command::Invoke { event } => {
            let config = build_service_config(&cli.service)?;
            let service = EmailPdfService::from_config(&config)?;
            let raw = match event {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read event from {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read event from stdin")?;
                    buf
                }
            };
            let request: ApiRequest = serde_json::from_str(&raw).context("Invalid event JSON")?;
            let response = service.handle(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Render { id } => {
            let config = build_service_config(&cli.service)?;
            let service = EmailPdfService::from_config(&config)?;
            let email = service
                .render_email_pdf(id)
                .await
                .with_context(|| format!("Failed to render email {id}"))?;
            println!("{}", serde_json::to_string_pretty(&email)?);
        }
        Command::Pages { input } => {
            let bytes = read_pdf(input).await?;
            println!("{}", pdf_ops::count_pages(&bytes).await?);
        }
        Command::Gutter { input } => {
            let tools = PdfTools::new(pdf_ops_config)?;
            let mut pdf = load_pdf_object(input).await?;
            tools.save_pdf(&mut pdf).await?;
            tools
                .add_gutter_margins(&mut pdf)
                .await
                .context("pdfjam failed")?;
            print_local_path(&pdf);
        }
        Command::BlankPage { input } => {
            let tools = PdfTools::new(pdf_ops_config)?;
            let mut pdf = load_pdf_object(input).await?;
            tools
                .append_blank_page(&mut pdf)
                .await
                .context("pdflatex failed")?;
            if !cli.quiet {
                eprintln!("{} pages", pdf.page_count);
            }
            print_local_path(&pdf);
        }
        Command::Concat { inputs, output } => {
            let tools = PdfTools::new(pdf_ops_config)?;
            match output {
                Some(path) => {
                    let bytes = tools.concat_to_buffer(inputs).await?;
                    tokio::fs::write(path, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => {
                    let path = tools.concat_to_file(inputs).await?;
                    println!("{}", path.display());
                }
            }
        }
        Command::Download {
            url,
            filename,
            checksum,
        } => {
            let tools = PdfTools::new(pdf_ops_config)?;
            let remote = RemotePdf {
                url: url.clone(),
                checksum: checksum.clone(),
                filename: filename.clone(),
            };
            let path = if cli.quiet {
                tools.download_pdf(&remote, None).await?
            } else {
                let bar = download_bar();
                let progress_bar = bar.clone();
                let report: &pdf_ops::DownloadProgress =
                    &move |received: u64, total: Option<u64>| {
                        if let Some(total) = total {
                            if progress_bar.length() != Some(total) {
                                progress_bar.set_length(total);
                            }
                        }
                        progress_bar.set_position(received);
                    };
                let path = tools.download_pdf(&remote, Some(report)).await?;
                bar.finish_with_message("done ✓");
                path
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn download_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Download");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── Config mapping ───────────────────────────────────────────────────────────

fn build_pdf_ops_config(args: &PdfOpsArgs) -> PdfOpsConfig {
    let defaults = PdfOpsConfig::default();
    PdfOpsConfig {
        work_dir: args.work_dir.clone().unwrap_or(defaults.work_dir),
        paper_width: args.paper_width.clone(),
        paper_height: args.paper_height.clone(),
        gutter_offset: args.gutter_offset.clone(),
        pdfjam_path: args.pdfjam.clone(),
        pdflatex_path: args.pdflatex.clone(),
        pdftk_path: args.pdftk.clone(),
        blank_page_template: args.blank_template.clone(),
        download_timeout_secs: args.download_timeout,
    }
}

fn build_service_config(args: &ServiceArgs) -> Result<ServiceConfig> {
    let storage = match args.storage {
        StorageKind::Memory => StorageConfig::Memory,
        StorageKind::Local => StorageConfig::Local {
            root: args.storage_root.clone(),
        },
        StorageKind::S3 => StorageConfig::S3 {
            bucket: match &args.s3_bucket {
                Some(bucket) => bucket.clone(),
                None => bail!("--s3-bucket (EMAIL_PDF_S3_BUCKET) is required with --storage s3"),
            },
            region: args.s3_region.clone(),
            endpoint: args.s3_endpoint.clone(),
        },
    };

    let mut builder = ServiceConfig::builder()
        .storage(storage)
        .public_path(&args.public_path)
        .public_base_url(&args.public_base_url)
        .page_size(&args.page_size)
        .orientation(args.orientation)
        .margin(&args.margin)
        .render_timeout_secs(args.render_timeout)
        .db_max_connections(args.db_max_connections)
        .run_migrations(args.run_migrations);

    if let Some(ref engine) = args.engine {
        builder = builder.engine_path(engine);
    }
    if let Some(ref url) = args.database_url {
        builder = builder.database_url(url);
    }

    builder.build().context("Invalid configuration")
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Wrap a local file as a `PdfObject` named after it.
async fn load_pdf_object(path: &Path) -> Result<PdfObject> {
    let bytes = read_pdf(path).await?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .context("Input has no file name")?;

    let mut pdf = PdfObject::new("file", stem, bytes);
    pdf.filename = path.file_name().map(|n| n.to_string_lossy().to_string());
    pdf.page_count = pdf_ops::count_pages(&pdf.buffer).await?;
    Ok(pdf)
}

fn print_local_path(pdf: &PdfObject) {
    if let Some(path) = &pdf.local_path {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", path.display()).ok();
    }
}
