//! Command-line definitions and dispatch

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::{
    api,
    config::{Settings, DEFAULT_CLIENT_SECRET, DEFAULT_TOKEN_CACHE},
    error::UsageError,
    google_drive::{Authenticator, GoogleDrive, TokenCache},
};

#[derive(Parser, Debug)]
#[command(name = "updrive", version, about = "Google Drive file operations.")]
pub struct Cli {
    /// Operation to perform
    #[arg(value_enum)]
    pub operation: Operation,

    /// Path to the local file or directory
    #[arg(long)]
    pub local_path: Option<PathBuf>,

    /// Google Drive folder id to upload into, list, or resolve names in
    #[arg(long)]
    pub drive_path: Option<String>,

    /// Name of the folder to create in Google Drive
    #[arg(long)]
    pub folder_name: Option<String>,

    /// Name of the file to download
    #[arg(long)]
    pub file_name: Option<String>,

    /// Cached OAuth credentials
    #[arg(long, env = "UPDRIVE_TOKEN_CACHE", default_value = DEFAULT_TOKEN_CACHE)]
    pub token_cache: PathBuf,

    /// OAuth client secret downloaded from the Google Cloud console
    #[arg(long, env = "UPDRIVE_CLIENT_SECRET", default_value = DEFAULT_CLIENT_SECRET)]
    pub client_secret: PathBuf,

    /// Request timeout in seconds
    #[arg(long, env = "UPDRIVE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    Upload,
    Download,
    List,
    ListFolders,
    CreateFolder,
}

/// A validated operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload {
        local_path: PathBuf,
        folder_id: Option<String>,
    },
    Download {
        file_name: String,
        target_dir: PathBuf,
        parent_id: Option<String>,
    },
    List {
        folder_id: Option<String>,
    },
    ListFolders,
    CreateFolder {
        folder_name: String,
        parent_id: Option<String>,
    },
}

impl TryFrom<&Cli> for Command {
    type Error = UsageError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let drive_path = cli.drive_path.clone();

        Ok(match cli.operation {
            Operation::Upload => {
                let local_path = cli.local_path.clone().ok_or(UsageError::MissingUploadPath)?;
                if !local_path.is_file() {
                    return Err(UsageError::NotAFile(local_path));
                }
                Command::Upload {
                    local_path,
                    folder_id: drive_path,
                }
            }
            Operation::Download => {
                let file_name = cli.file_name.clone().ok_or(UsageError::MissingFileName)?;
                let target_dir = cli.local_path.clone().ok_or(UsageError::MissingTargetDir)?;
                if !target_dir.is_dir() {
                    return Err(UsageError::NotADirectory(target_dir));
                }
                Command::Download {
                    file_name,
                    target_dir,
                    parent_id: drive_path,
                }
            }
            Operation::List => Command::List {
                folder_id: drive_path,
            },
            Operation::ListFolders => Command::ListFolders,
            Operation::CreateFolder => Command::CreateFolder {
                folder_name: cli.folder_name.clone().ok_or(UsageError::MissingFolderName)?,
                parent_id: drive_path,
            },
        })
    }
}

/// Validates the arguments, authenticates and runs the operation.
///
/// Usage errors are written to `out` and are not failures: nothing has been
/// sent to Drive at that point.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let command = match Command::try_from(&cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(?e, "invalid arguments");
            writeln!(out, "Error: {e}")?;
            return Ok(());
        }
    };

    let drive = connect(&Settings::from(&cli)).await?;
    execute(&drive, command, out).await
}

pub async fn connect(settings: &Settings) -> Result<GoogleDrive> {
    let http = settings.http_client()?;
    let store = TokenCache::new(&settings.token_cache);

    let auth = Authenticator::authenticate(
        http.clone(),
        Box::new(store),
        &settings.client_secret,
        &settings.scopes,
    )
    .await?;

    Ok(GoogleDrive::new(http, auth))
}

pub async fn execute(drive: &GoogleDrive, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Upload {
            local_path,
            folder_id,
        } => {
            api::upload_file(drive, out, &local_path, folder_id.as_deref()).await?;
        }
        Command::Download {
            file_name,
            target_dir,
            parent_id,
        } => {
            match api::get_file_id_by_name(drive, out, &file_name, parent_id.as_deref()).await? {
                Some(id) => {
                    let file_path = target_dir.join(&file_name);
                    api::download_file(drive, out, &id, &file_path).await?;
                }
                None => writeln!(out, "Error: No file found with the name {file_name}.")?,
            }
        }
        Command::List { folder_id } => {
            api::list_files(drive, out, folder_id.as_deref()).await?;
        }
        Command::ListFolders => {
            api::list_folders(drive, out).await?;
        }
        Command::CreateFolder {
            folder_name,
            parent_id,
        } => {
            api::create_folder(drive, out, &folder_name, parent_id.as_deref()).await?;
        }
    }

    Ok(())
}
