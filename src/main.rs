use std::io::Write;
use std::path::PathBuf;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use untar_light::{Error, Result, TarEntry, list, unpack};

/// untar
#[derive(Debug, Parser)]
#[clap(name = "untar", version)]
struct App {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List files in a tar archive
    List {
        tarfile: PathBuf,
        /// Show type, mode, owner and modification time
        #[clap(long, short)]
        long: bool,
    },
    /// Write one file's contents to stdout
    Cat { tarfile: PathBuf, name: String },
    /// Extract regular files and directories
    Unpack { tarfile: PathBuf, directory: PathBuf },
}

fn format_mtime(entry: &TarEntry) -> String {
    entry
        .mtime
        .and_then(|t| i64::try_from(t).ok())
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_owner(entry: &TarEntry) -> String {
    let user = match &entry.uname {
        Some(name) if !name.is_empty() => name.clone(),
        _ => entry.uid.map_or("-".to_string(), |uid| uid.to_string()),
    };
    let group = match &entry.gname {
        Some(name) if !name.is_empty() => name.clone(),
        _ => entry.gid.map_or("-".to_string(), |gid| gid.to_string()),
    };
    format!("{}/{}", user, group)
}

fn run(app: App) -> Result<()> {
    match app.cmd {
        Command::List { tarfile, long } => {
            let entries = list(&tarfile)?;
            println!("Files in {}:", tarfile.display());
            if long {
                println!("{} {:>7} {:<16} {:>10}  {:<16}  {}", "T", "Mode", "Owner", "Size", "Modified", "Name");
            } else {
                println!("{:>10}  {}", "Size", "Name");
            }
            println!("{}", "-".repeat(50));
            for entry in &entries {
                if long {
                    let mode = entry.mode.map_or("-".to_string(), |m| m.to_string());
                    let mut name = entry.name.clone();
                    if !entry.linkname.is_empty() {
                        name = format!("{} -> {}", name, entry.linkname);
                    }
                    println!(
                        "{} {:>7} {:<16} {:>10}  {:<16}  {}",
                        entry.type_flag.as_char(),
                        mode,
                        format_owner(entry),
                        entry.size,
                        format_mtime(entry),
                        name
                    );
                } else {
                    println!("{:>10}  {}", entry.size, entry.name);
                }
            }
            println!("\nTotal: {} file(s)", entries.len());
        }
        Command::Cat { tarfile, name } => {
            let entries = list(&tarfile)?;
            let entry = entries
                .iter()
                .find(|e| e.name == name && e.is_file())
                .ok_or_else(|| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{} not found in {}", name, tarfile.display()),
                    ))
                })?;
            std::io::stdout().write_all(&entry.payload)?;
        }
        Command::Unpack { tarfile, directory } => {
            unpack(&tarfile, &directory)?;
            println!("Extraction complete to: {}", directory.display());
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let app = App::parse();
    if let Err(e) = run(app) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
