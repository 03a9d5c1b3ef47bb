//! Sync command: upload a file or tree, optionally deleting remote leftovers.

use anyhow::{Context, Result};
use clap::Args;
use objsync_core::config::{ContentTypeRule, ObjsyncConfig};
use objsync_core::filter::PathFilter;
use objsync_core::store::RemoteStore;
use objsync_core::sync::{sync, SyncOptions, SyncReport};
use objsync_core::upload::TransferContext;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Remote path: a key prefix for directories, a key (or `prefix/`) for a file.
    pub remote_path: String,

    /// Local file or directory.
    pub local_path: PathBuf,

    /// Skip paths matching this case-insensitive regex (directories only).
    #[arg(long, value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Keep paths matching this regex even if --exclude matches.
    #[arg(long, value_name = "REGEX")]
    pub include: Option<String>,

    /// Content type for paths matching REGEX. May be repeated; first match wins.
    #[arg(long = "content-type", num_args = 2, value_names = ["REGEX", "TYPE"])]
    pub content_types: Vec<String>,

    /// Cache-Control value for every uploaded object.
    #[arg(long, value_name = "VALUE")]
    pub cache_control: Option<String>,

    /// Files uploaded concurrently (default from config: 8).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=256))]
    pub threads: Option<u32>,

    /// Part uploads in flight across all multipart files (default from config: 16).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=256))]
    pub multipart_threads: Option<u32>,

    /// Delete remote objects that do not exist locally.
    #[arg(long)]
    pub delete: bool,

    /// Do not replace remote objects that already exist.
    #[arg(long)]
    pub no_overwrite: bool,

    /// Compare sizes only when deciding whether a file is up to date.
    #[arg(long)]
    pub ignore_mtime: bool,
}

impl SyncArgs {
    /// Config with command-line overrides applied.
    fn apply_to(&self, cfg: &ObjsyncConfig) -> ObjsyncConfig {
        let mut cfg = cfg.clone();
        if let Some(n) = self.threads {
            cfg.threads = n as usize;
        }
        if let Some(n) = self.multipart_threads {
            cfg.multipart_threads = n as usize;
        }
        if self.cache_control.is_some() {
            cfg.cache_control = self.cache_control.clone();
        }
        cfg.ignore_mtime |= self.ignore_mtime;
        // Command-line rules take precedence over configured ones.
        let mut rules: Vec<ContentTypeRule> = self
            .content_types
            .chunks_exact(2)
            .map(|pair| ContentTypeRule {
                pattern: pair[0].clone(),
                content_type: pair[1].clone(),
            })
            .collect();
        rules.append(&mut cfg.content_types);
        cfg.content_types = rules;
        cfg
    }
}

pub async fn run_sync(store: Arc<dyn RemoteStore>, cfg: &ObjsyncConfig, args: SyncArgs) -> Result<bool> {
    let cfg = args.apply_to(cfg);
    let mut ctx = TransferContext::from_config(store, &cfg).context("invalid content-type pattern")?;
    ctx.options.overwrite = !args.no_overwrite;

    let options = SyncOptions {
        filter: PathFilter::new(args.exclude.as_deref(), args.include.as_deref())
            .context("invalid --exclude/--include pattern")?,
        delete_remote: args.delete,
        lanes: cfg.threads,
    };
    let report = sync(Arc::new(ctx), &args.local_path, &args.remote_path, &options)
        .await
        .with_context(|| format!("sync {}", args.local_path.display()))?;
    print_report(&report);
    Ok(!report.has_failures())
}

fn print_report(report: &SyncReport) {
    for failure in &report.failures {
        eprintln!("Failed: {}: {}", failure.path, failure.error);
    }
    println!();
    println!("Total local files: {}", report.total_local);
    println!("Total remote files: {}", report.total_remote);
    println!(
        "Successfully uploaded {} files ({} bytes).",
        report.uploaded, report.uploaded_bytes
    );
    println!("Failed to upload {} files.", report.failed);
    println!("Deleted {} files.", report.deleted);
    println!("Failed to delete {} files.", report.failed_delete);
    println!("Skipped {} files (already up to date).", report.skipped);
    println!("Excluded {} local files from upload.", report.excluded_local);
    println!("Excluded {} remote files from deletion.", report.excluded_remote);
}
