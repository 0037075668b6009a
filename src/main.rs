//! gphoto-capture binary for driving a tethered camera from the shell.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gphoto_capture::{BindingConfig, Camera, CameraError, GPhotoDriver};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "gphoto-capture", version, about = "Control a camera through libgphoto2")]
struct Cli {
    /// TOML file with settings, port and event timeout
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to bind to, e.g. usb:001,004 (overrides the config file)
    #[arg(long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the camera model
    Model,
    /// Capture an image and print where it was stored
    Capture,
    /// Fire a capture without waiting for the file
    Trigger,
    /// Download a file from the camera
    Download {
        #[arg(long)]
        folder: String,
        #[arg(long)]
        file: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Delete a file on the camera
    Delete {
        #[arg(long)]
        folder: String,
        #[arg(long)]
        file: String,
    },
    /// List folders (or files) on the camera
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Walk every subfolder
        #[arg(long, conflicts_with = "files")]
        recursive: bool,
        /// List files instead of folders
        #[arg(long)]
        files: bool,
    },
    /// Change a menu, text or radio setting
    SetConfig { key: String, value: String },
    /// Wait for the next camera event
    Wait {
        /// Timeout in milliseconds (defaults to the config file value)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err}");
        if let Some(status) = err.status() {
            eprintln!("  {}", Camera::<GPhotoDriver>::result_to_string(status));
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> gphoto_capture::Result<()> {
    let mut config = match &cli.config {
        Some(path) => BindingConfig::load(path)?,
        None => BindingConfig::default(),
    };
    if cli.port.is_some() {
        config.port = cli.port;
    }

    let camera = Camera::new(GPhotoDriver::new()?);
    camera.init_with(&config)?;

    let result = execute(&camera, &config, cli.command);
    let exited = camera.exit();
    result.and(exited)
}

fn execute(
    camera: &Camera<GPhotoDriver>,
    config: &BindingConfig,
    command: Command,
) -> gphoto_capture::Result<()> {
    match command {
        Command::Model => {
            println!("{}", camera.model()?);
        }
        Command::Capture => {
            let path = camera.trigger_capture_to_file()?;
            println!("{path}");
        }
        Command::Trigger => {
            camera.trigger_capture()?;
        }
        Command::Download { folder, file, out } => {
            let mut reader = camera.file_reader(&folder, &file)?;
            let mut target = File::create(&out)?;
            let written = io::copy(&mut reader, &mut target)?;
            reader.close();
            info!(bytes = written, out = %out.display(), "downloaded file");
        }
        Command::Delete { folder, file } => {
            camera.delete_file(&folder, &file)?;
        }
        Command::Ls {
            path,
            recursive,
            files,
        } => {
            let names = if recursive {
                camera.recursive_list_folders(&path)
            } else if files {
                camera.list_files(&path)
            } else {
                camera.list_folders(&path)
            };
            match names {
                Ok(names) => names.iter().for_each(|name| println!("{name}")),
                Err(CameraError::PartialListing { names, status, .. }) => {
                    names.iter().for_each(|name| println!("{name}"));
                    return Err(CameraError::Native(status));
                }
                Err(err) => return Err(err),
            }
        }
        Command::SetConfig { key, value } => {
            camera.set_config(&key, &value)?;
        }
        Command::Wait { timeout_ms } => {
            let timeout = timeout_ms.map_or_else(|| config.event_timeout(), Duration::from_millis);
            let event = camera.async_wait_for_event(timeout)?.blocking_recv()?;
            match event.path() {
                Some(path) => println!("{:?} {path}", event.kind()),
                None => println!("{:?}", event.kind()),
            }
        }
    }
    Ok(())
}
