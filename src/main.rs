//! folio CLI - render ticket records to a paginated PDF

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, ValueEnum};

use folio::error::AssetError;
use folio::{AssetFetcher, FsFetcher, HttpFetcher, LayoutMode, RenderOptions};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Render ticket records to a print-ready PDF", long_about = None)]
struct Cli {
    /// JSON input: an array of records or {"records": [...], "options": {...}}.
    /// Reads stdin when omitted.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file (defaults to the suggested file name)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Document title
    #[arg(long)]
    title: Option<String>,

    /// Application label shown in the header
    #[arg(long)]
    app_title: Option<String>,

    /// Custom font URL or path
    #[arg(long, value_name = "URL")]
    font: Option<String>,

    /// Logo image URL or path
    #[arg(long, value_name = "URL")]
    logo: Option<String>,

    /// Stamp image URL or path
    #[arg(long, value_name = "URL")]
    stamp: Option<String>,

    /// Serve asset paths from this directory
    #[arg(long, value_name = "DIR", conflicts_with = "base_url")]
    asset_root: Option<PathBuf>,

    /// Fetch asset paths from this server
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Write the CSV export instead of a PDF
    #[arg(long)]
    csv: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    List,
    Detail,
}

impl From<LayoutArg> for LayoutMode {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::List => LayoutMode::List,
            LayoutArg::Detail => LayoutMode::Detail,
        }
    }
}

/// The fetcher picked by command-line flags.
enum CliFetcher {
    Fs(FsFetcher),
    Http(HttpFetcher),
}

impl AssetFetcher for CliFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        match self {
            CliFetcher::Fs(f) => f.fetch(url).await,
            CliFetcher::Http(f) => f.fetch(url).await,
        }
    }
}

impl Cli {
    fn fetcher(&self) -> CliFetcher {
        match (&self.asset_root, &self.base_url) {
            (Some(root), _) => CliFetcher::Fs(FsFetcher::new(root)),
            (None, Some(base)) => CliFetcher::Http(HttpFetcher::new(base.as_str())),
            // absolute URLs still work without a base
            (None, None) => CliFetcher::Http(HttpFetcher::default()),
        }
    }

    /// Flags override whatever options the input carried.
    fn apply(&self, options: &mut RenderOptions) {
        if let Some(layout) = self.layout {
            options.layout = layout.into();
        }
        let overrides = [
            (&self.title, &mut options.title),
            (&self.app_title, &mut options.app_title),
            (&self.font, &mut options.font_url),
            (&self.logo, &mut options.logo_url),
            (&self.stamp, &mut options.stamp_url),
        ];
        for (flag, field) in overrides {
            if flag.is_some() {
                *field = flag.clone();
            }
        }
    }
}

fn read_input(input: Option<&Path>) -> folio::Result<String> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

async fn run(cli: &Cli) -> folio::Result<PathBuf> {
    let json = read_input(cli.input.as_deref())?;
    let mut request = folio::parse_request(&json)?;
    cli.apply(&mut request.options);

    if cli.csv {
        let path = cli.output.clone().unwrap_or_else(|| {
            PathBuf::from(folio::export::csv_filename(Local::now().date_naive()))
        });
        folio::export::write_csv(&path, &request.records)?;
        return Ok(path);
    }

    let doc = folio::build(&request.records, &request.options, cli.fetcher()).await?;
    let path = cli.output.clone().unwrap_or_else(|| PathBuf::from(&doc.filename));
    std::fs::write(&path, &doc.bytes)?;
    log::info!("wrote {} pages to {}", doc.page_count, path.display());
    Ok(path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            log::debug!("export failed: {}", e);
            eprintln!("Export failed (set RUST_LOG=debug for details)");
            std::process::exit(1);
        }
    }
}
