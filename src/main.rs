use clap::Parser;
use photo_relay::config::{self, RelayConfig};
use photo_relay::record::FileRecordStore;
use photo_relay::{archive::Archiver, logging, output, pipeline};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "photo-relay")]
#[command(about = "Post one photo at a time from a folder tree to Instagram")]
#[command(long_about = "\
Post one photo at a time from a folder tree to Instagram

Runs in two steps so the chosen image can be deployed to a public host in
between:

  photo-relay prepare    pick an image, caption it, write upload_meta.txt
  photo-relay publish    wait for the public URL, post, archive the file

Content structure:

  images_to_upload/
  ├── Trips/                  # Category: caption becomes \"Trips // <date taken>\"
  │   ├── beach.jpg
  │   └── 2023/harbour.png    # Nested files use the top-level category
  └── Street Life/
      └── corner.JPEG

Publishing needs IG_ACCESS_TOKEN, IG_BUSINESS_ID and PUBLIC_IMAGE_BASE_URL
(or the matching keys in photo-relay.toml).

Run 'photo-relay gen-config' to generate a documented photo-relay.toml.")]
#[command(version)]
struct Cli {
    /// Run mode: prepare, publish or gen-config (default: prepare)
    mode: Option<String>,

    /// Config file (missing file is fine)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Folder of category subfolders holding images to post
    #[arg(long)]
    content_root: Option<PathBuf>,

    /// Folder posted images are moved into
    #[arg(long)]
    archive_root: Option<PathBuf>,

    /// Transfer record file written by prepare, read by publish
    #[arg(long)]
    record: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Prepare,
    Publish,
    GenConfig,
}

impl Mode {
    /// Absent or unknown modes fall back to prepare.
    fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("prepare") => Self::Prepare,
            Some("publish") => Self::Publish,
            Some("gen-config") => Self::GenConfig,
            Some(other) => {
                warn!(mode = other, "Unknown mode, running prepare");
                Self::Prepare
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // gen-config must work even when the environment holds a broken value.
    if cli.mode.as_deref() == Some("gen-config") {
        print!("{}", config::config_template());
        return Ok(());
    }

    let config = RelayConfig::load(&cli.config)?.with_overrides(
        cli.content_root,
        cli.archive_root,
        cli.record,
    );
    logging::init_logging(&config.log.filter)?;
    let store = FileRecordStore::new(&config.paths.record);

    match Mode::from_arg(cli.mode.as_deref()) {
        Mode::Prepare => {
            let now = chrono::Local::now().naive_local();
            let record = pipeline::prepare(
                &config.paths.content_root,
                &store,
                &mut rand::thread_rng(),
                now,
            )?;
            output::print_stage_output(&record);
        }
        Mode::Publish => {
            let settings = config.publish_settings()?;
            let (gate, publisher) = pipeline::connect(&settings)?;
            let archiver = Archiver::new(&config.paths.archive_root);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_publish_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline::publish(
                &store,
                &settings.public_base_url,
                &gate,
                &publisher,
                &archiver,
                Some(&tx),
            );
            drop(tx);
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            output::print_publish_output(&result?);
        }
        Mode::GenConfig => print!("{}", config::config_template()),
    }
    Ok(())
}
